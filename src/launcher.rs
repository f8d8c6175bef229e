//! Deep-link handoff to a native app, with a timed web fallback.
//!
//! There is no signal telling whether a native handler picked up the URI, so
//! the fallback fires once the delay has passed no matter what happened.
//! This is best-effort: a user with the app installed may also get a tab.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{event, Level};

use crate::core::models::TrackRef;
use crate::navigation::Navigator;

pub const FALLBACK_DELAY: Duration = Duration::from_millis(2000);

#[derive(Clone)]
pub struct Launcher {
    navigator: Arc<dyn Navigator>,
    delay: Duration,
}

impl std::fmt::Debug for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Launcher {{ delay: {:?} }}", self.delay)
    }
}

fn is_web_url(payload: &str) -> bool {
    payload.starts_with("http://") || payload.starts_with("https://")
}

impl Launcher {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self {
            navigator,
            delay: FALLBACK_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Points a hidden target at the canonical URI, then after the delay
    /// opens `original_payload` in a new tab if it is a web URL and discards
    /// the hidden target. The returned handle may be dropped.
    #[tracing::instrument(skip(self, original_payload), fields(track = %track))]
    pub fn launch(&self, track: &TrackRef, original_payload: &str) -> JoinHandle<()> {
        let hidden = match self.navigator.open_hidden(&track.uri()) {
            Ok(target) => Some(target),
            Err(e) => {
                event!(Level::WARN, error = %e, "Native handoff failed to dispatch");
                None
            }
        };

        let navigator = Arc::clone(&self.navigator);
        let delay = self.delay;
        let fallback = is_web_url(original_payload).then(|| original_payload.to_string());

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            event!(Level::DEBUG, "Deep-link fallback delay elapsed");
            if let Some(url) = fallback {
                if let Err(e) = navigator.open_new_tab(&url) {
                    event!(Level::WARN, error = %e, "Web fallback failed");
                }
            }
            if let Some(target) = hidden {
                navigator.discard(target);
            }
        })
    }
}
