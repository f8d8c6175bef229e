use std::sync::{Arc, Mutex};

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{event, Level};

pub mod error;
pub mod sdk;

pub use error::{Error, Precondition};
pub use sdk::{PlayerEvent, PlayerEvents, PlayerOptions, PlayerSdk, SdkState};

use crate::core::models::{PlaybackDevice, TrackRef};
use crate::core::types::{AccessToken, DeviceId};
use crate::provider::ProviderApi;

#[derive(Debug, Clone)]
pub struct PlayerSettings {
    pub name: String,
    pub volume: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            volume: 0.5,
        }
    }
}

/// Plays canonical track refs on a player registered through the SDK.
pub struct PlaybackSession {
    sdk: Arc<dyn PlayerSdk>,
    api: Arc<dyn ProviderApi>,
    settings: PlayerSettings,
    token: Mutex<Option<AccessToken>>,
    state: Arc<watch::Sender<SdkState>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PlaybackSession {{ state: {:?} }}", self.sdk_state())
    }
}

impl PlaybackSession {
    pub fn new(sdk: Arc<dyn PlayerSdk>, api: Arc<dyn ProviderApi>, settings: PlayerSettings) -> Self {
        let (state, _) = watch::channel(SdkState::Idle);
        Self {
            sdk,
            api,
            settings,
            token: Mutex::new(None),
            state: Arc::new(state),
            pump: Mutex::new(None),
        }
    }

    pub fn sdk_state(&self) -> SdkState {
        self.state.borrow().clone()
    }

    /// Follows readiness changes after connect, e.g. to surface `NotReady`.
    pub fn subscribe(&self) -> watch::Receiver<SdkState> {
        self.state.subscribe()
    }

    pub fn device(&self) -> PlaybackDevice {
        let state = self.sdk_state();
        PlaybackDevice {
            device_id: state.device_id().cloned(),
            ready: matches!(state, SdkState::Ready(_)),
        }
    }

    /// Registers the player and waits for the first `Ready` or fatal error.
    #[tracing::instrument(skip_all, fields(player = %self.settings.name))]
    pub async fn connect(&self, token: AccessToken) -> Result<DeviceId, Error> {
        self.stop_pump();
        self.set_token(Some(token.clone()));
        self.state.send_replace(SdkState::Connecting);

        let (events, mut rx) = PlayerEvents::channel();
        // Resolved by the first Ready or fatal event, so a later NotReady
        // cannot hide the outcome from the waiter.
        let (settled_tx, settled) = oneshot::channel::<SdkState>();

        let state = Arc::clone(&self.state);
        let pump = tokio::spawn(async move {
            let mut settled_tx = Some(settled_tx);
            while let Some(player_event) = rx.recv().await {
                state.send_modify(|s| {
                    *s = s.apply(&player_event);
                });
                let current = state.borrow().clone();
                if current.is_settled() {
                    if let Some(tx) = settled_tx.take() {
                        let _ = tx.send(current);
                    }
                }
                match &player_event {
                    PlayerEvent::Ready(id) => event!(Level::INFO, device_id = %id, "Player ready"),
                    PlayerEvent::NotReady(id) => event!(Level::WARN, device_id = %id, "Player went offline"),
                    other => event!(Level::ERROR, event = ?other, "Player failed"),
                }
            }
            state.send_if_modified(|s| match s {
                SdkState::Connecting => {
                    *s = SdkState::Failed("player stopped reporting".to_string());
                    true
                }
                _ => false,
            });
        });
        self.set_pump(pump);

        let options = PlayerOptions {
            name: self.settings.name.clone(),
            token,
            volume: self.settings.volume,
        };
        if !self.sdk.connect(options, events).await {
            self.stop_pump();
            let reason = "the player refused to connect".to_string();
            self.state.send_replace(SdkState::Failed(reason.clone()));
            return Err(Error::Initialization(reason));
        }

        let outcome = match settled.await {
            Ok(state) => state,
            Err(_) => SdkState::Failed("player stopped reporting".to_string()),
        };
        match outcome {
            SdkState::Ready(id) => Ok(id),
            SdkState::Failed(reason) => Err(Error::Initialization(reason)),
            _ => Err(Error::Initialization("player never became ready".to_string())),
        }
    }

    /// Starts `track` on the connected player. Fails without any network call
    /// when there is no token or no ready device; failures are not retried.
    #[tracing::instrument(skip(self), fields(track = %track))]
    pub async fn play(&self, track: &TrackRef) -> Result<(), Error> {
        let token = match self.token() {
            Some(token) if !token.is_empty() => token,
            _ => return Err(Precondition::MissingToken.into()),
        };
        let device_id = match self.device().ready_id() {
            Some(id) => id.clone(),
            None => return Err(Precondition::NoDevice.into()),
        };

        self.api
            .play(&token, &device_id, track)
            .await
            .map_err(|e| {
                event!(Level::WARN, error = %e, "Play command failed");
                Error::from(e)
            })
    }

    pub async fn disconnect(&self) {
        self.stop_pump();
        self.sdk.disconnect().await;
        self.set_token(None);
        self.state.send_replace(SdkState::Idle);
    }

    fn token(&self) -> Option<AccessToken> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn set_token(&self, token: Option<AccessToken>) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = token;
        }
    }

    fn set_pump(&self, pump: JoinHandle<()>) {
        if let Ok(mut slot) = self.pump.lock() {
            *slot = Some(pump);
        }
    }

    fn stop_pump(&self) {
        let pump = self.pump.lock().ok().and_then(|mut slot| slot.take());
        if let Some(pump) = pump {
            pump.abort();
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.stop_pump();
    }
}
