use crate::auth::pkce::Verifier;
use crate::core::types::{AccessToken, AuthCode, ClientId, GrantType, RedirectUri, Scope};

/// Form body of the authorization-code exchange.
#[derive(Debug)]
#[derive(serde::Serialize)]
pub struct TokenRequest {
    pub grant_type: GrantType,
    pub code: AuthCode,
    pub redirect_uri: RedirectUri,
    pub client_id: ClientId,
    pub code_verifier: String,
}

impl TokenRequest {
    pub fn authorization_code(
        code: AuthCode,
        redirect_uri: RedirectUri,
        client_id: ClientId,
        pkce_verifier: Verifier,
    ) -> Self {
        Self {
            grant_type: GrantType::AuthorizationCode,
            code,
            redirect_uri,
            client_id,
            code_verifier: pkce_verifier.value,
        }
    }
}

#[derive(Debug)]
#[derive(serde::Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: AccessToken,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<Scope>,
}
