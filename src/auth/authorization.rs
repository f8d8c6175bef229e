use url::Url;

use crate::auth::pkce::{Challenge, Transformation};
use crate::core::types::{AuthCode, ClientId, RedirectUri, ResponseType, Scope};

#[derive(Debug, Clone)]
#[derive(serde::Serialize)]
pub struct AuthorizationRequest {
    pub response_type: ResponseType,
    pub client_id: ClientId,
    pub scope: Scope,
    pub code_challenge_method: Transformation,
    pub code_challenge: String,
    pub redirect_uri: RedirectUri,
}

impl AuthorizationRequest {
    pub fn new(client_id: ClientId, scope: Scope, challenge: Challenge, redirect_uri: RedirectUri) -> Self {
        Self {
            response_type: ResponseType::Code,
            client_id,
            scope,
            code_challenge_method: challenge.method,
            code_challenge: challenge.code,
            redirect_uri,
        }
    }

    /// The authorization endpoint with this request appended to its query.
    pub fn to_url(&self, endpoint: &Url) -> Result<Url, serde_urlencoded::ser::Error> {
        let mut url = endpoint.clone();
        let qs = serde_urlencoded::to_string(self)?;
        let pairs = form_urlencoded::parse(qs.as_bytes());
        url.query_pairs_mut().extend_pairs(pairs);
        Ok(url)
    }
}

/// What the provider appended to the redirect URI.
#[derive(Debug, Clone, Default)]
#[derive(serde::Deserialize)]
pub struct AuthorizationCallback {
    pub code: Option<AuthCode>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl AuthorizationCallback {
    pub fn from_location(location: &Url) -> Self {
        let mut callback = Self::default();
        for (key, value) in location.query_pairs() {
            match key.as_ref() {
                "code" if !value.is_empty() => callback.code = Some(AuthCode(value.into_owned())),
                "error" => callback.error = Some(value.into_owned()),
                "error_description" => callback.error_description = Some(value.into_owned()),
                _ => {}
            }
        }
        callback
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.error.is_none()
    }
}

/// `location` without the callback parameters, so reloading it does not
/// submit the same code twice.
pub fn strip_callback_params(location: &Url) -> Url {
    const CALLBACK_PARAMS: &[&str] = &["code", "error", "error_description"];

    let kept: Vec<(String, String)> = location
        .query_pairs()
        .filter(|(k, _)| !CALLBACK_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = location.clone();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url
}
