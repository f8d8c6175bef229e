#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use url::Url;

use scantune::auth::access_token::{AccessTokenResponse, TokenRequest};
use scantune::core::models::TrackRef;
use scantune::core::types::{AccessToken, DeviceId};
use scantune::navigation::{self, HiddenTarget, Navigator};
use scantune::playback::{PlayerEvent, PlayerEvents, PlayerOptions, PlayerSdk};
use scantune::provider::{self, Device, PlayRequest, ProviderApi};
use scantune::scan::{Camera, CameraDecoder, DecodeSink, Feedback, Status, Trigger};

pub fn token(s: &str) -> AccessToken {
    AccessToken(s.to_string())
}

pub fn device(s: &str) -> DeviceId {
    DeviceId(s.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Exchange(String),
    Play {
        token: String,
        device: String,
        body: serde_json::Value,
    },
    Devices,
}

/// Records every call; answers from the configured outcomes.
#[derive(Default)]
pub struct FakeApi {
    pub calls: Mutex<Vec<ApiCall>>,
    pub exchange_status: Mutex<Option<u16>>,
    pub play_status: Mutex<Option<u16>>,
    pub devices: Mutex<Vec<Device>>,
    /// When set, `exchange_code` waits for a permit before answering.
    pub exchange_gate: Option<Arc<Notify>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            exchange_gate: Some(gate),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn play_calls(&self) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ApiCall::Play { .. }))
            .collect()
    }

    pub fn fail_exchange_with(&self, status: u16) {
        *self.exchange_status.lock().unwrap() = Some(status);
    }

    pub fn fail_play_with(&self, status: u16) {
        *self.play_status.lock().unwrap() = Some(status);
    }
}

#[async_trait]
impl ProviderApi for FakeApi {
    async fn exchange_code(&self, req: &TokenRequest) -> Result<AccessTokenResponse, provider::Error> {
        let form = serde_urlencoded::to_string(req).unwrap();
        self.calls.lock().unwrap().push(ApiCall::Exchange(form));
        if let Some(gate) = &self.exchange_gate {
            gate.notified().await;
        }
        if let Some(status) = *self.exchange_status.lock().unwrap() {
            return Err(provider::Error::Status(status));
        }
        Ok(serde_json::from_str(r#"{"access_token":"fresh-token","token_type":"Bearer","expires_in":3600}"#).unwrap())
    }

    async fn play(&self, token: &AccessToken, device: &DeviceId, track: &TrackRef) -> Result<(), provider::Error> {
        self.calls.lock().unwrap().push(ApiCall::Play {
            token: token.0.clone(),
            device: device.0.clone(),
            body: serde_json::to_value(PlayRequest::single(track)).unwrap(),
        });
        match *self.play_status.lock().unwrap() {
            Some(status) => Err(provider::Error::Status(status)),
            None => Ok(()),
        }
    }

    async fn devices(&self, _token: &AccessToken) -> Result<Vec<Device>, provider::Error> {
        self.calls.lock().unwrap().push(ApiCall::Devices);
        Ok(self.devices.lock().unwrap().clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Nav {
    Redirect(Url),
    Replace(Url),
    NewTab(String),
    Hidden(String),
    Discard(HiddenTarget),
}

#[derive(Default)]
pub struct FakeNavigator {
    pub log: Mutex<Vec<Nav>>,
    next: AtomicUsize,
}

impl FakeNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn log(&self) -> Vec<Nav> {
        self.log.lock().unwrap().clone()
    }
}

impl Navigator for FakeNavigator {
    fn redirect(&self, url: &Url) -> Result<(), navigation::Error> {
        self.log.lock().unwrap().push(Nav::Redirect(url.clone()));
        Ok(())
    }

    fn replace_location(&self, url: &Url) {
        self.log.lock().unwrap().push(Nav::Replace(url.clone()));
    }

    fn open_new_tab(&self, url: &str) -> Result<(), navigation::Error> {
        self.log.lock().unwrap().push(Nav::NewTab(url.to_string()));
        Ok(())
    }

    fn open_hidden(&self, uri: &str) -> Result<HiddenTarget, navigation::Error> {
        self.log.lock().unwrap().push(Nav::Hidden(uri.to_string()));
        Ok(HiddenTarget(self.next.fetch_add(1, Ordering::SeqCst) as u64))
    }

    fn discard(&self, target: HiddenTarget) {
        self.log.lock().unwrap().push(Nav::Discard(target));
    }
}

/// Emits the scripted events on connect and keeps the handle for later ones.
#[derive(Default)]
pub struct FakeSdk {
    pub script: Vec<PlayerEvent>,
    pub refuse: bool,
    pub events: Mutex<Option<PlayerEvents>>,
    pub options: Mutex<Option<PlayerOptions>>,
    pub disconnects: AtomicUsize,
}

impl FakeSdk {
    pub fn ready(id: &str) -> Arc<Self> {
        Arc::new(Self {
            script: vec![PlayerEvent::Ready(device(id))],
            ..Self::default()
        })
    }

    pub fn scripted(script: Vec<PlayerEvent>) -> Arc<Self> {
        Arc::new(Self {
            script,
            ..Self::default()
        })
    }

    pub fn refusing() -> Arc<Self> {
        Arc::new(Self {
            refuse: true,
            ..Self::default()
        })
    }

    pub fn emit(&self, event: PlayerEvent) {
        if let Some(events) = self.events.lock().unwrap().as_ref() {
            events.emit(event);
        }
    }
}

#[async_trait]
impl PlayerSdk for FakeSdk {
    async fn connect(&self, options: PlayerOptions, events: PlayerEvents) -> bool {
        if self.refuse {
            return false;
        }
        *self.options.lock().unwrap() = Some(options);
        for event in &self.script {
            events.emit(event.clone());
        }
        *self.events.lock().unwrap() = Some(events);
        true
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().take();
    }
}

/// Counts decoders so tests can see how many camera resources are held.
#[derive(Default)]
pub struct FakeCamera {
    pub available: bool,
    pub fail_start: bool,
    pub built: AtomicUsize,
    pub live: Arc<AtomicUsize>,
    pub disposed: Arc<AtomicUsize>,
    pub sink: Mutex<Option<DecodeSink>>,
    /// When set, decoder start waits for a permit.
    pub start_gate: Option<Arc<Notify>>,
}

impl FakeCamera {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            available: true,
            ..Self::default()
        })
    }

    pub fn missing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            available: true,
            fail_start: true,
            ..Self::default()
        })
    }

    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            available: true,
            start_gate: Some(gate),
            ..Self::default()
        })
    }

    pub fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn decoded(&self, data: &str) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink.decoded(data);
        }
    }

    pub fn noise(&self) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink.failed("no code in frame");
        }
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn has_camera(&self) -> bool {
        tokio::task::yield_now().await;
        self.available
    }

    fn decoder(&self, sink: DecodeSink) -> Box<dyn CameraDecoder> {
        self.built.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        Box::new(FakeDecoder {
            live: Arc::clone(&self.live),
            disposed: Arc::clone(&self.disposed),
            fail_start: self.fail_start,
            gate: self.start_gate.clone(),
            started: false,
        })
    }
}

struct FakeDecoder {
    live: Arc<AtomicUsize>,
    disposed: Arc<AtomicUsize>,
    fail_start: bool,
    gate: Option<Arc<Notify>>,
    started: bool,
}

#[async_trait]
impl CameraDecoder for FakeDecoder {
    async fn start(&mut self) -> Result<(), String> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_start {
            return Err("permission denied".to_string());
        }
        self.started = true;
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        if self.started {
            self.started = false;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn dispose(mut self: Box<Self>) {
        self.stop();
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeFeedback {
    pub statuses: Mutex<Vec<Status>>,
    pub triggers: Mutex<Vec<Trigger>>,
}

impl FakeFeedback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn last_status(&self) -> Option<Status> {
        self.statuses.lock().unwrap().last().cloned()
    }

    pub fn triggers(&self) -> Vec<Trigger> {
        self.triggers.lock().unwrap().clone()
    }
}

impl Feedback for FakeFeedback {
    fn status(&self, status: Status) {
        self.statuses.lock().unwrap().push(status);
    }

    fn trigger(&self, trigger: Trigger) {
        self.triggers.lock().unwrap().push(trigger);
    }
}
