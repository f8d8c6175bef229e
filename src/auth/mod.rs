use std::sync::{Arc, Mutex};

use url::Url;

pub mod access_token;
pub mod authorization;
pub mod error;
pub mod pkce;
pub mod store;

pub use access_token::{AccessTokenResponse, TokenRequest};
pub use authorization::{AuthorizationCallback, AuthorizationRequest};
pub use error::Error;
pub use store::{FileVerifierStore, MemoryVerifierStore, VerifierStore};

use crate::core::types::{AccessToken, ClientId, RedirectUri, Scope};
use crate::navigation::Navigator;
use crate::provider::ProviderApi;

use tracing::{event, Level};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    NoSession,
    AwaitingRedirect,
    ExchangingCode,
    Authenticated,
    Failed(Error),
}

/// What `on_load` did with the location it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// The user was sent to the authorization endpoint.
    Redirected(Url),
    Authenticated(AccessToken),
    /// The flow was reset while the exchange was in flight; its result was dropped.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub client_id: ClientId,
    pub redirect_uri: RedirectUri,
    pub scope: Scope,
    pub authorize_endpoint: Url,
}

#[derive(Debug)]
struct Session {
    state: AuthState,
    attempt: u64,
    access_token: Option<AccessToken>,
}

/// Authorization-code flow with PKCE for a public client.
pub struct AuthFlow {
    settings: AuthSettings,
    api: Arc<dyn ProviderApi>,
    store: Arc<dyn VerifierStore>,
    navigator: Arc<dyn Navigator>,
    session: Mutex<Session>,
}

impl std::fmt::Debug for AuthFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthFlow {{ state: {:?} }}", self.state())
    }
}

impl AuthFlow {
    pub fn new(
        settings: AuthSettings,
        api: Arc<dyn ProviderApi>,
        store: Arc<dyn VerifierStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            settings,
            api,
            store,
            navigator,
            session: Mutex::new(Session {
                state: AuthState::NoSession,
                attempt: 0,
                access_token: None,
            }),
        }
    }

    pub fn state(&self) -> AuthState {
        self.with_session(|s| s.state.clone())
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.with_session(|s| s.access_token.clone())
    }

    /// Back to `NoSession`; anything still in flight is discarded when it lands.
    pub fn reset(&self) {
        self.with_session(|s| {
            s.state = AuthState::NoSession;
            s.attempt += 1;
            s.access_token = None;
        });
    }

    /// Inspects the current location: without an authorization code the
    /// user is sent off to authorize, with one the code is exchanged.
    #[tracing::instrument(skip_all, fields(location = %location.path()))]
    pub async fn on_load(&self, location: &Url) -> Result<AuthStep, Error> {
        let callback = AuthorizationCallback::from_location(location);

        if let Some(error) = callback.error {
            let reason = match callback.error_description {
                Some(description) => format!("{} ({})", error, description),
                None => error,
            };
            let attempt = self.begin(AuthState::ExchangingCode);
            return Err(self.fail(attempt, Error::Redirect(reason)));
        }

        match callback.code {
            Some(code) => self.exchange(code, location).await,
            None => {
                if let Some(token) = self.access_token() {
                    return Ok(AuthStep::Authenticated(token));
                }
                self.authorize()
            }
        }
    }

    /// Generates a fresh verifier, persists it and redirects to the
    /// authorization endpoint.
    pub fn authorize(&self) -> Result<AuthStep, Error> {
        let attempt = self.begin(AuthState::AwaitingRedirect);
        match self.authorization_url() {
            Ok(url) => match self.navigator.redirect(&url) {
                Ok(()) => Ok(AuthStep::Redirected(url)),
                Err(e) => Err(self.fail(attempt, e.into())),
            },
            Err(e) => Err(self.fail(attempt, e)),
        }
    }

    /// Persists a new verifier and returns the URL to send the user to.
    pub fn authorization_url(&self) -> Result<Url, Error> {
        let verifier = pkce::Verifier::generate();
        self.store.save(&verifier)?;

        let req = AuthorizationRequest::new(
            self.settings.client_id.clone(),
            self.settings.scope.clone(),
            verifier.challenge(),
            self.settings.redirect_uri.clone(),
        );
        req.to_url(&self.settings.authorize_endpoint)
            .map_err(|e| Error::Redirect(e.to_string()))
    }

    async fn exchange(&self, code: crate::core::types::AuthCode, location: &Url) -> Result<AuthStep, Error> {
        let attempt = self.begin(AuthState::ExchangingCode);

        let verifier = match self.store.load() {
            Ok(Some(verifier)) => verifier,
            Ok(None) => return Err(self.fail(attempt, Error::MissingVerifier)),
            Err(e) => return Err(self.fail(attempt, e.into())),
        };

        let req = TokenRequest::authorization_code(
            code,
            self.settings.redirect_uri.clone(),
            self.settings.client_id.clone(),
            verifier,
        );

        event!(Level::DEBUG, "Exchanging authorization code");
        let result = self.api.exchange_code(&req).await;

        if !self.is_current(attempt) {
            event!(Level::DEBUG, "Dropping superseded token exchange");
            return Ok(AuthStep::Superseded);
        }

        match result {
            Ok(response) => {
                let token = response.access_token;
                self.with_session(|s| {
                    s.state = AuthState::Authenticated;
                    s.access_token = Some(token.clone());
                });
                self.navigator
                    .replace_location(&authorization::strip_callback_params(location));
                event!(Level::INFO, "Authenticated");
                Ok(AuthStep::Authenticated(token))
            }
            Err(e) => Err(self.fail(attempt, e.into())),
        }
    }

    fn begin(&self, state: AuthState) -> u64 {
        self.with_session(|s| {
            s.attempt += 1;
            s.state = state;
            s.access_token = None;
            s.attempt
        })
    }

    fn is_current(&self, attempt: u64) -> bool {
        self.with_session(|s| s.attempt == attempt)
    }

    fn fail(&self, attempt: u64, error: Error) -> Error {
        event!(Level::WARN, %error, "Authorization failed");
        self.with_session(|s| {
            if s.attempt == attempt {
                s.state = AuthState::Failed(error.clone());
            }
        });
        error
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        let mut session = match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut session)
    }
}
