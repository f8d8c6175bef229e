use std::sync::Arc;

use async_trait::async_trait;
use tracing::{event, Level};

use crate::core::types::DeviceId;
use crate::playback::sdk::{PlayerEvent, PlayerEvents, PlayerOptions, PlayerSdk};
use crate::provider::{Device, ProviderApi};

/// A player backed by one of the account's existing remote devices, for
/// hosts that cannot run the provider's in-browser player.
pub struct RemoteDeviceSdk {
    api: Arc<dyn ProviderApi>,
}

impl RemoteDeviceSdk {
    pub fn new(api: Arc<dyn ProviderApi>) -> Self {
        Self { api }
    }
}

/// Prefers a device named like the player, then the active one, then any
/// device that accepts remote commands.
pub fn pick_device(devices: &[Device], name: &str) -> Option<DeviceId> {
    let usable = || devices.iter().filter(|d| !d.is_restricted && d.id.is_some());

    usable()
        .find(|d| d.name.eq_ignore_ascii_case(name))
        .or_else(|| usable().find(|d| d.is_active))
        .or_else(|| usable().next())
        .and_then(|d| d.id.clone())
}

#[async_trait]
impl PlayerSdk for RemoteDeviceSdk {
    #[tracing::instrument(skip_all, fields(player = %options.name))]
    async fn connect(&self, options: PlayerOptions, events: PlayerEvents) -> bool {
        let player_event = match self.api.devices(&options.token).await {
            Ok(devices) => match pick_device(&devices, &options.name) {
                Some(id) => PlayerEvent::Ready(id),
                None => PlayerEvent::InitializationError(
                    "no playback device is online; open the provider's app somewhere first".to_string(),
                ),
            },
            Err(e) if e.status() == Some(401) => PlayerEvent::AuthenticationError(e.to_string()),
            Err(e) => PlayerEvent::InitializationError(e.to_string()),
        };
        event!(Level::DEBUG, event = ?player_event, "Remote device lookup finished");
        events.emit(player_event);
        true
    }
}
