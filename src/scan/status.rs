use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{event, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub kind: StatusKind,
}

impl Status {
    pub const AUTO_HIDE: Duration = Duration::from_millis(3000);

    pub fn info(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: StatusKind::Info }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: StatusKind::Success }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: StatusKind::Error }
    }

    /// Success and error messages are transient; info stays until replaced.
    pub fn auto_hide(&self) -> Option<Duration> {
        match self.kind {
            StatusKind::Info => None,
            StatusKind::Success | StatusKind::Error => Some(Self::AUTO_HIDE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerLabel {
    Start,
    Starting,
    Stop,
}

/// The button that toggles scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub enabled: bool,
    pub label: TriggerLabel,
}

impl Trigger {
    pub const START: Trigger = Trigger { enabled: true, label: TriggerLabel::Start };
    pub const STARTING: Trigger = Trigger { enabled: false, label: TriggerLabel::Starting };
    pub const STOP: Trigger = Trigger { enabled: true, label: TriggerLabel::Stop };
}

pub trait Feedback: Send + Sync {
    fn status(&self, status: Status);
    fn trigger(&self, trigger: Trigger);
}

impl std::fmt::Debug for dyn Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Feedback {{ ... }}")
    }
}

/// Writes status lines to stderr and the log, and tracks which one is still
/// on screen. Transient statuses drop off after [`Status::AUTO_HIDE`].
#[derive(Debug, Default)]
pub struct ConsoleFeedback {
    shown: Arc<Mutex<Shown>>,
}

#[derive(Debug, Default)]
struct Shown {
    status: Option<Status>,
    serial: u64,
}

impl ConsoleFeedback {
    pub fn current(&self) -> Option<Status> {
        self.shown.lock().ok().and_then(|shown| shown.status.clone())
    }
}

impl Feedback for ConsoleFeedback {
    fn status(&self, status: Status) {
        match status.kind {
            StatusKind::Error => event!(Level::WARN, text = %status.message, "Status"),
            _ => event!(Level::INFO, text = %status.message, "Status"),
        }
        eprintln!("{}", status.message);

        let hide_after = status.auto_hide();
        let serial = match self.shown.lock() {
            Ok(mut shown) => {
                shown.serial += 1;
                shown.status = Some(status);
                shown.serial
            }
            Err(_) => return,
        };

        // Outside a runtime the status simply stays until replaced.
        let (Some(delay), Ok(runtime)) = (hide_after, tokio::runtime::Handle::try_current()) else {
            return;
        };
        let shown = Arc::clone(&self.shown);
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(mut shown) = shown.lock() {
                if shown.serial == serial {
                    shown.status = None;
                    event!(Level::TRACE, "Status hidden");
                }
            }
        });
    }

    fn trigger(&self, trigger: Trigger) {
        event!(Level::TRACE, ?trigger, "trigger");
    }
}
