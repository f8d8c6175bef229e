//! The contract with the provider's player SDK, and the small state machine
//! its callbacks drive.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::types::{AccessToken, DeviceId};

#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub name: String,
    pub token: AccessToken,
    pub volume: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Ready(DeviceId),
    NotReady(DeviceId),
    InitializationError(String),
    AuthenticationError(String),
    AccountError(String),
}

/// Handed to the SDK on connect; the SDK reports through it for as long as
/// the player lives.
#[derive(Debug, Clone)]
pub struct PlayerEvents(mpsc::UnboundedSender<PlayerEvent>);

impl PlayerEvents {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PlayerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    /// Events sent after the session stopped listening are dropped.
    pub fn emit(&self, event: PlayerEvent) {
        let _ = self.0.send(event);
    }
}

#[async_trait]
pub trait PlayerSdk: Send + Sync {
    /// Registers a player instance with the provider. Returns `false` when
    /// the SDK refuses to even try (unsupported environment and the like).
    async fn connect(&self, options: PlayerOptions, events: PlayerEvents) -> bool;

    async fn disconnect(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkState {
    Idle,
    Connecting,
    Ready(DeviceId),
    /// The device went offline; it may come back with another `Ready`.
    NotReady(DeviceId),
    Failed(String),
}

impl SdkState {
    pub fn apply(&self, event: &PlayerEvent) -> SdkState {
        use PlayerEvent::*;

        if let SdkState::Failed(_) = self {
            return self.clone();
        }
        match event {
            Ready(id) => SdkState::Ready(id.clone()),
            NotReady(id) => SdkState::NotReady(id.clone()),
            InitializationError(msg) => SdkState::Failed(format!("initialization error: {}", msg)),
            AuthenticationError(msg) => SdkState::Failed(format!("authentication error: {}", msg)),
            AccountError(msg) => SdkState::Failed(format!("account error: {}", msg)),
        }
    }

    /// True once connect has a result: ready or failed.
    pub fn is_settled(&self) -> bool {
        matches!(self, SdkState::Ready(_) | SdkState::Failed(_))
    }

    pub fn device_id(&self) -> Option<&DeviceId> {
        match self {
            SdkState::Ready(id) | SdkState::NotReady(id) => Some(id),
            _ => None,
        }
    }
}
