//! Camera lifecycle and decode routing.
//!
//! `Idle -> Starting -> Active -> Stopping -> Idle`, with `Starting -> Idle`
//! when the camera cannot be started. The session is the only owner of the
//! decoder: it is acquired while `Starting` and released on every way out of
//! `Active`. Each start bumps a generation counter so a start that completes
//! after the session moved on hands its decoder straight back.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{event, Level};

pub mod decoder;
pub mod status;

pub use decoder::{Camera, CameraDecoder, DecodeEvent, DecodeSink, LineCamera};
pub use status::{ConsoleFeedback, Feedback, Status, StatusKind, Trigger, TriggerLabel};

use crate::core::models::TrackRef;
use crate::launcher::Launcher;
use crate::normalize::Normalizer;
use crate::playback::PlaybackSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    Idle,
    Starting,
    Active,
    Stopping,
}

/// Where recognized tracks go.
#[derive(Debug, Clone)]
pub enum Route {
    DeepLink(Launcher),
    Authenticated(Arc<PlaybackSession>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    CameraUnavailable,
    CameraStart(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CameraUnavailable => write!(f, "no camera found on this device"),
            Self::CameraStart(reason) => write!(f, "camera could not be started: {}", reason),
        }
    }
}

impl std::error::Error for Error {}

/// What a single decode event led to.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Decoder noise, or the session was no longer scanning.
    Ignored,
    Unrecognized,
    Launched(TrackRef),
    Played(TrackRef),
    PlaybackFailed(TrackRef, crate::playback::Error),
}

struct Inner {
    generation: u64,
    decoder: Option<Box<dyn CameraDecoder>>,
    pump: Option<JoinHandle<()>>,
}

pub struct ScanSession {
    camera: Arc<dyn Camera>,
    normalizer: Normalizer,
    route: Route,
    feedback: Arc<dyn Feedback>,
    state: watch::Sender<ScannerState>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScanSession {{ state: {:?}, route: {:?} }}", self.state(), self.route)
    }
}

enum Toggle {
    Start(u64),
    Stop,
    Busy(ScannerState),
}

impl ScanSession {
    pub fn new(
        camera: Arc<dyn Camera>,
        normalizer: Normalizer,
        route: Route,
        feedback: Arc<dyn Feedback>,
    ) -> Self {
        let (state, _) = watch::channel(ScannerState::Idle);
        Self {
            camera,
            normalizer,
            route,
            feedback,
            state,
            inner: Mutex::new(Inner {
                generation: 0,
                decoder: None,
                pump: None,
            }),
        }
    }

    pub fn state(&self) -> ScannerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScannerState> {
        self.state.subscribe()
    }

    /// Starts scanning when idle, stops when active; ignored mid-transition.
    pub async fn toggle(self: &Arc<Self>) -> Result<ScannerState, Error> {
        let action = self.with_inner(|inner| match self.state() {
            ScannerState::Idle => {
                inner.generation += 1;
                self.state.send_replace(ScannerState::Starting);
                Toggle::Start(inner.generation)
            }
            ScannerState::Active => {
                self.state.send_replace(ScannerState::Stopping);
                Toggle::Stop
            }
            other => Toggle::Busy(other),
        });

        match action {
            Toggle::Start(generation) => self.start(generation).await,
            Toggle::Stop => {
                self.release(true);
                self.feedback.status(Status::info("Scanner stopped"));
                Ok(ScannerState::Idle)
            }
            Toggle::Busy(state) => {
                event!(Level::DEBUG, ?state, "Toggle ignored mid-transition");
                Ok(state)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn start(self: &Arc<Self>, generation: u64) -> Result<ScannerState, Error> {
        self.feedback.trigger(Trigger::STARTING);

        if !self.camera.has_camera().await {
            return Err(self.fail_start(generation, Error::CameraUnavailable));
        }

        let (sink, rx) = DecodeSink::channel();
        let mut decoder = self.camera.decoder(sink);
        if let Err(reason) = decoder.start().await {
            decoder.dispose();
            return Err(self.fail_start(generation, Error::CameraStart(reason)));
        }

        let installed = self.with_inner(|inner| {
            if inner.generation != generation || self.state() != ScannerState::Starting {
                return Err(decoder);
            }
            inner.decoder = Some(decoder);
            inner.pump = Some(tokio::spawn(Arc::clone(self).pump(generation, rx)));
            self.state.send_replace(ScannerState::Active);
            Ok(())
        });

        match installed {
            Ok(()) => {
                event!(Level::INFO, "Camera active");
                self.feedback.trigger(Trigger::STOP);
                self.feedback
                    .status(Status::info("Camera active - hold a QR code in front of the camera"));
                Ok(ScannerState::Active)
            }
            Err(mut stale) => {
                event!(Level::DEBUG, "Releasing decoder from a superseded start");
                stale.stop();
                stale.dispose();
                Ok(self.state())
            }
        }
    }

    fn fail_start(&self, generation: u64, error: Error) -> Error {
        event!(Level::WARN, %error, "Scanner failed to start");
        let current = self.with_inner(|inner| {
            if inner.generation == generation && self.state() == ScannerState::Starting {
                self.state.send_replace(ScannerState::Idle);
                true
            } else {
                false
            }
        });
        if current {
            self.feedback.trigger(Trigger::START);
            self.feedback.status(Status::error(format!("Error: {}", error)));
        }
        error
    }

    async fn pump(self: Arc<Self>, generation: u64, mut rx: mpsc::UnboundedReceiver<DecodeEvent>) {
        while let Some(decode) = rx.recv().await {
            if !self.with_inner(|inner| inner.generation == generation) {
                break;
            }
            self.handle_decode(decode).await;
        }
    }

    /// Routes one decoder result. Only the first recognized code of a scanning
    /// session acts; it stops the camera before the track is handed on.
    pub async fn handle_decode(&self, decode: DecodeEvent) -> ScanOutcome {
        let data = match decode {
            DecodeEvent::Decoded { data } => data,
            DecodeEvent::Failed(reason) => {
                event!(Level::TRACE, %reason, "Decode noise");
                return ScanOutcome::Ignored;
            }
        };

        if self.state() != ScannerState::Active {
            return ScanOutcome::Ignored;
        }

        let track = match self.normalizer.normalize(&data) {
            Some(track) => track,
            None => {
                event!(Level::DEBUG, payload = %data, "Unrecognized code");
                let provider = &self.normalizer.provider().scheme;
                self.feedback
                    .status(Status::error(format!("This is not a {} track code", provider)));
                return ScanOutcome::Unrecognized;
            }
        };

        let claimed = self.with_inner(|_| {
            if self.state() == ScannerState::Active {
                self.state.send_replace(ScannerState::Stopping);
                true
            } else {
                false
            }
        });
        if !claimed {
            return ScanOutcome::Ignored;
        }
        self.release(false);

        event!(Level::INFO, track = %track, "Code recognized");
        match &self.route {
            Route::DeepLink(launcher) => {
                launcher.launch(&track, &data);
                self.feedback.status(Status::success("Opening track..."));
                ScanOutcome::Launched(track)
            }
            Route::Authenticated(playback) => {
                self.feedback.status(Status::info("Starting playback..."));
                match playback.play(&track).await {
                    Ok(()) => {
                        self.feedback.status(Status::success("Playing"));
                        ScanOutcome::Played(track)
                    }
                    Err(e) => {
                        self.feedback.status(Status::error(e.to_string()));
                        ScanOutcome::PlaybackFailed(track, e)
                    }
                }
            }
        }
    }

    /// Releases the camera whatever state the session is in.
    pub fn dispose(&self) {
        self.release(true);
    }

    // `abort_pump` is false when called from inside the pump itself; the
    // pump exits on its own once it sees the generation move.
    fn release(&self, abort_pump: bool) {
        let (decoder, pump) = self.with_inner(|inner| {
            inner.generation += 1;
            self.state.send_replace(ScannerState::Idle);
            (inner.decoder.take(), inner.pump.take())
        });

        if let Some(mut decoder) = decoder {
            decoder.stop();
            decoder.dispose();
            event!(Level::DEBUG, "Camera released");
        }
        if let Some(pump) = pump {
            if abort_pump {
                pump.abort();
            }
        }
        self.feedback.trigger(Trigger::START);
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut inner)
    }
}
