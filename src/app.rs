//! The composition root: one `AppSession` per page lifetime, holding what
//! would otherwise be global state (auth session, player, scanner).

use std::sync::Arc;

use tracing::{event, Level};
use url::Url;

use crate::auth::{AuthFlow, AuthSettings, AuthStep, VerifierStore};
use crate::config::{AuthMode, Config};
use crate::core::types::DeviceId;
use crate::launcher::Launcher;
use crate::navigation::Navigator;
use crate::normalize::Normalizer;
use crate::playback::{PlaybackSession, PlayerSdk};
use crate::provider::ProviderApi;
use crate::scan::{Camera, Feedback, Route, ScanSession, Status};

/// External pieces the session is wired from.
#[derive(Clone)]
pub struct Collaborators {
    pub camera: Arc<dyn Camera>,
    pub navigator: Arc<dyn Navigator>,
    pub api: Arc<dyn ProviderApi>,
    pub sdk: Arc<dyn PlayerSdk>,
    pub store: Arc<dyn VerifierStore>,
    pub feedback: Arc<dyn Feedback>,
}

#[derive(Debug)]
pub enum Error {
    Auth(crate::auth::Error),
    Playback(crate::playback::Error),
}

impl From<crate::auth::Error> for Error {
    fn from(e: crate::auth::Error) -> Self {
        Self::Auth(e)
    }
}

impl From<crate::playback::Error> for Error {
    fn from(e: crate::playback::Error) -> Self {
        Self::Playback(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth(e) => write!(f, "{}", e),
            Self::Playback(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Deep-link mode, nothing to set up.
    Ready,
    /// The user was sent off to log in; load again with the callback location.
    AwaitingLogin(Url),
    Connected(DeviceId),
    /// A newer load replaced this one while it was in flight.
    Superseded,
}

#[derive(Debug)]
pub struct AppSession {
    mode: AuthMode,
    auth: Option<Arc<AuthFlow>>,
    playback: Option<Arc<PlaybackSession>>,
    scanner: Arc<ScanSession>,
    feedback: Arc<dyn Feedback>,
}

impl AppSession {
    pub fn init(config: &Config, parts: Collaborators) -> Self {
        let normalizer = Normalizer::with_provider(config.provider.clone());

        let (auth, playback, route) = match (config.mode, &config.client_id) {
            (AuthMode::Authenticated, Some(client_id)) => {
                let settings = AuthSettings {
                    client_id: client_id.clone(),
                    redirect_uri: config.redirect_uri.clone(),
                    scope: config.scope.clone(),
                    authorize_endpoint: config.endpoints.authorize.clone(),
                };
                let auth = Arc::new(AuthFlow::new(
                    settings,
                    Arc::clone(&parts.api),
                    Arc::clone(&parts.store),
                    Arc::clone(&parts.navigator),
                ));
                let playback = Arc::new(PlaybackSession::new(
                    Arc::clone(&parts.sdk),
                    Arc::clone(&parts.api),
                    config.player.clone(),
                ));
                let route = Route::Authenticated(Arc::clone(&playback));
                (Some(auth), Some(playback), route)
            }
            (mode, _) => {
                if mode == AuthMode::Authenticated {
                    event!(Level::WARN, "No client id configured, falling back to deep links");
                }
                let route = Route::DeepLink(Launcher::new(Arc::clone(&parts.navigator)));
                (None, None, route)
            }
        };

        let mode = if auth.is_some() { AuthMode::Authenticated } else { AuthMode::DeepLink };
        let scanner = Arc::new(ScanSession::new(
            parts.camera,
            normalizer,
            route,
            Arc::clone(&parts.feedback),
        ));

        event!(Level::DEBUG, ?mode, "Session initialized");
        Self {
            mode,
            auth,
            playback,
            scanner,
            feedback: parts.feedback,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn auth(&self) -> Option<&Arc<AuthFlow>> {
        self.auth.as_ref()
    }

    pub fn playback(&self) -> Option<&Arc<PlaybackSession>> {
        self.playback.as_ref()
    }

    pub fn scanner(&self) -> &Arc<ScanSession> {
        &self.scanner
    }

    /// Runs the auth flow against `location` and, once a token is in hand,
    /// connects the player. Failures are shown to the user as well as returned.
    pub async fn load(&self, location: &Url) -> Result<LoadOutcome, Error> {
        let (auth, playback) = match (&self.auth, &self.playback) {
            (Some(auth), Some(playback)) => (auth, playback),
            _ => return Ok(LoadOutcome::Ready),
        };

        let result = self.authenticate_and_connect(auth, playback, location).await;
        match &result {
            Ok(LoadOutcome::Connected(_)) => self.feedback.status(Status::success("Player ready")),
            Ok(LoadOutcome::AwaitingLogin(_)) => self.feedback.status(Status::info("Logging in...")),
            Err(e) => self.feedback.status(Status::error(e.to_string())),
            _ => {}
        }
        result
    }

    async fn authenticate_and_connect(
        &self,
        auth: &AuthFlow,
        playback: &PlaybackSession,
        location: &Url,
    ) -> Result<LoadOutcome, Error> {
        let token = match auth.on_load(location).await? {
            AuthStep::Redirected(url) => return Ok(LoadOutcome::AwaitingLogin(url)),
            AuthStep::Superseded => return Ok(LoadOutcome::Superseded),
            AuthStep::Authenticated(token) => token,
        };
        let device_id = playback.connect(token).await?;
        Ok(LoadOutcome::Connected(device_id))
    }

    pub async fn dispose(self) {
        self.scanner.dispose();
        if let Some(playback) = &self.playback {
            playback.disconnect().await;
        }
        if let Some(auth) = &self.auth {
            auth.reset();
        }
        event!(Level::DEBUG, "Session disposed");
    }
}
