//! The navigation surface the auth flow and launcher drive.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{event, Level};
use url::Url;

#[derive(Debug)]
pub enum Error {
    Open(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Open(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(e) => write!(f, "could not open link: {}", e),
        }
    }
}

impl std::error::Error for Error {}

/// A short-lived, invisible navigation target handed to a custom URI scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HiddenTarget(pub u64);

pub trait Navigator: Send + Sync {
    /// Leaves the current location for `url`.
    fn redirect(&self, url: &Url) -> Result<(), Error>;
    /// Rewrites the visible location without navigating.
    fn replace_location(&self, url: &Url);
    fn open_new_tab(&self, url: &str) -> Result<(), Error>;
    fn open_hidden(&self, uri: &str) -> Result<HiddenTarget, Error>;
    fn discard(&self, target: HiddenTarget);
}

/// Hands everything to the operating system's registered URL handlers.
/// There is no address bar to rewrite, so `replace_location` only logs.
#[derive(Debug, Default)]
pub struct SystemNavigator {
    next_target: AtomicU64,
}

impl Navigator for SystemNavigator {
    fn redirect(&self, url: &Url) -> Result<(), Error> {
        event!(Level::INFO, %url, "Opening in browser");
        open::that_detached(url.as_str())?;
        Ok(())
    }

    fn replace_location(&self, url: &Url) {
        event!(Level::DEBUG, %url, "Callback handled");
    }

    fn open_new_tab(&self, url: &str) -> Result<(), Error> {
        open::that_detached(url)?;
        Ok(())
    }

    fn open_hidden(&self, uri: &str) -> Result<HiddenTarget, Error> {
        let target = HiddenTarget(self.next_target.fetch_add(1, Ordering::Relaxed));
        event!(Level::DEBUG, uri, target = target.0, "Dispatching to native handler");
        open::that_detached(uri)?;
        Ok(target)
    }

    fn discard(&self, target: HiddenTarget) {
        event!(Level::TRACE, target = target.0, "Discarding hidden target");
    }
}
