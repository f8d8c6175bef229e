//! The camera/decoder contract the scan session owns.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{event, Level};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    Decoded { data: String },
    /// A frame without a readable code. Expected noise.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct DecodeSink(mpsc::UnboundedSender<DecodeEvent>);

impl DecodeSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DecodeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    pub fn decoded(&self, data: impl Into<String>) {
        self.send(DecodeEvent::Decoded { data: data.into() });
    }

    pub fn failed(&self, reason: impl Into<String>) {
        self.send(DecodeEvent::Failed(reason.into()));
    }

    /// Frames that arrive after the session released the decoder are dropped.
    fn send(&self, decode: DecodeEvent) {
        if let Err(e) = self.0.send(decode) {
            event!(Level::TRACE, decode = ?e.0, "Decode after release dropped");
        }
    }
}

#[async_trait]
pub trait Camera: Send + Sync {
    async fn has_camera(&self) -> bool;
    /// Builds a decoder bound to this camera that reports into `sink`.
    fn decoder(&self, sink: DecodeSink) -> Box<dyn CameraDecoder>;
}

#[async_trait]
pub trait CameraDecoder: Send {
    async fn start(&mut self) -> Result<(), String>;
    fn stop(&mut self);
    fn dispose(self: Box<Self>);
}

/// Treats each line of a text stream as one decoded frame. Blank lines are
/// reported as decode failures.
pub struct LineCamera<R> {
    lines: Arc<Mutex<Lines<R>>>,
    exhausted: Arc<watch::Sender<bool>>,
}

impl<R> LineCamera<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: Arc::new(Mutex::new(reader.lines())),
            exhausted: Arc::new(watch::channel(false).0),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        *self.exhausted.borrow()
    }

    /// Resolves once the stream has ended.
    pub async fn exhausted(&self) {
        let mut rx = self.exhausted.subscribe();
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl LineCamera<tokio::io::BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R> Camera for LineCamera<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn has_camera(&self) -> bool {
        !self.is_exhausted()
    }

    fn decoder(&self, sink: DecodeSink) -> Box<dyn CameraDecoder> {
        Box::new(LineDecoder {
            lines: Arc::clone(&self.lines),
            exhausted: Arc::clone(&self.exhausted),
            sink: Some(sink),
            task: None,
        })
    }
}

struct LineDecoder<R> {
    lines: Arc<Mutex<Lines<R>>>,
    exhausted: Arc<watch::Sender<bool>>,
    sink: Option<DecodeSink>,
    task: Option<JoinHandle<()>>,
}

#[async_trait]
impl<R> CameraDecoder for LineDecoder<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn start(&mut self) -> Result<(), String> {
        let sink = self.sink.clone().ok_or_else(|| "decoder already disposed".to_string())?;
        let lines = Arc::clone(&self.lines);
        let exhausted = Arc::clone(&self.exhausted);

        self.task = Some(tokio::spawn(async move {
            let mut lines = lines.lock().await;
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => sink.failed("no code in frame"),
                    Ok(Some(line)) => sink.decoded(line.trim()),
                    Ok(None) => {
                        exhausted.send_replace(true);
                        break;
                    }
                    Err(e) => {
                        event!(Level::WARN, error = %e, "Input stream failed");
                        exhausted.send_replace(true);
                        break;
                    }
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn dispose(mut self: Box<Self>) {
        self.stop();
        self.sink = None;
    }
}
