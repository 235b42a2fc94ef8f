//! Test harness for engine integration tests
//!
//! Provides:
//! - `MockBackend`: scriptable media backend whose state is shared with the
//!   test through `Arc<Mutex<MockState>>`
//! - `MockFactory`: records every backend it creates together with the
//!   event sink, so tests can fire readiness / error / playing callbacks
//! - `Harness`: a synchronously driven `SyncEngine` plus a notification
//!   subscriber

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use pmms_common::events::{Attenuation, Handle, HostCommand, Notification, Options, UpdateFrame};
use pmms_sync::backend::{
    BackendEventSink, BackendFactory, BackendKind, BackendRequest, MediaBackend, ReadyState,
    VideoMetadata,
};
use pmms_sync::config::MediaConfig;
use pmms_sync::events::{BackendEvent, EngineEvent, EventBus, SourceRole};
use pmms_sync::playback::effects::{FilterKind, FilterProfile, VisualizationConfig};
use pmms_sync::playback::PlaybackEntity;
use pmms_sync::{Error, Result, SyncEngine};
use tokio::sync::{broadcast, mpsc};

// ============================================================================
// Mock backend
// ============================================================================

#[derive(Debug, Clone)]
pub struct MockState {
    pub ready: bool,
    pub duration: Option<f64>,
    pub live: bool,
    pub title: Option<String>,
    pub position: f64,
    pub volume: f64,
    pub paused: bool,
    pub play_calls: usize,
    pub pause_calls: usize,
    pub seeks: Vec<f64>,
    pub volumes: Vec<f64>,
    pub filters: Vec<FilterKind>,
    pub visualizations: Vec<VisualizationConfig>,
    pub released: bool,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            ready: false,
            duration: Some(200.0),
            live: false,
            title: None,
            position: 0.0,
            volume: 1.0,
            paused: true,
            play_calls: 0,
            pause_calls: 0,
            seeks: Vec::new(),
            volumes: Vec::new(),
            filters: Vec::new(),
            visualizations: Vec::new(),
            released: false,
        }
    }
}

pub struct MockBackend {
    element_id: String,
    kind: BackendKind,
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl MediaBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn element_id(&self) -> &str {
        &self.element_id
    }

    fn ready_state(&self) -> ReadyState {
        if self.state().ready {
            ReadyState::HaveEnoughData
        } else {
            ReadyState::HaveNothing
        }
    }

    fn duration(&self) -> Option<f64> {
        self.state().duration
    }

    fn current_position(&self) -> f64 {
        self.state().position
    }

    fn seek(&mut self, position: f64) {
        let mut state = self.state();
        state.position = position;
        state.seeks.push(position);
    }

    fn volume(&self) -> f64 {
        self.state().volume
    }

    fn set_volume(&mut self, volume: f64) {
        let mut state = self.state();
        state.volume = volume;
        state.volumes.push(volume);
    }

    fn is_paused(&self) -> bool {
        self.state().paused
    }

    fn play(&mut self) {
        let mut state = self.state();
        state.paused = false;
        state.play_calls += 1;
    }

    fn pause(&mut self) {
        let mut state = self.state();
        state.paused = true;
        state.pause_calls += 1;
    }

    fn is_live(&self) -> bool {
        self.state().live
    }

    fn video_metadata(&self) -> Option<VideoMetadata> {
        self.state().title.clone().map(|title| VideoMetadata {
            title: Some(title),
            video_id: None,
        })
    }

    fn attach_filter(&mut self, profile: &FilterProfile) -> Result<()> {
        self.state().filters.push(profile.kind);
        Ok(())
    }

    fn attach_visualization(&mut self, config: &VisualizationConfig) -> Result<()> {
        self.state().visualizations.push(config.clone());
        Ok(())
    }

    fn release(&mut self) {
        let mut state = self.state();
        state.released = true;
        state.paused = true;
    }
}

// ============================================================================
// Mock factory
// ============================================================================

/// One backend created by the factory
#[derive(Clone)]
pub struct Created {
    pub request: BackendRequest,
    pub sink: BackendEventSink,
    pub state: Arc<Mutex<MockState>>,
}

impl Created {
    pub fn state(&self) -> MockState {
        self.state.lock().unwrap().clone()
    }

    pub fn with_state(&self, f: impl FnOnce(&mut MockState)) {
        f(&mut self.state.lock().unwrap());
    }
}

#[derive(Clone, Default)]
pub struct MockFactory {
    pub template: Arc<Mutex<MockState>>,
    pub created: Arc<Mutex<Vec<Created>>>,
    pub fail: Arc<Mutex<bool>>,
}

impl MockFactory {
    pub fn created(&self) -> Vec<Created> {
        self.created.lock().unwrap().clone()
    }

    /// Most recent backend created for `handle` in `role`
    pub fn latest(&self, handle: &Handle, role: SourceRole) -> Option<Created> {
        self.created()
            .into_iter()
            .rev()
            .find(|c| c.sink.handle() == handle && c.sink.role() == role)
    }
}

impl BackendFactory for MockFactory {
    fn create(
        &self,
        request: BackendRequest,
        events: BackendEventSink,
    ) -> Result<Box<dyn MediaBackend>> {
        if *self.fail.lock().unwrap() {
            return Err(Error::Backend("mock factory refused".to_string()));
        }

        let state = Arc::new(Mutex::new(self.template.lock().unwrap().clone()));
        self.created.lock().unwrap().push(Created {
            request: request.clone(),
            sink: events,
            state: Arc::clone(&state),
        });

        Ok(Box::new(MockBackend {
            element_id: request.element_id,
            kind: request.source.kind,
            state,
        }))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub engine: SyncEngine,
    pub rx: mpsc::UnboundedReceiver<EngineEvent>,
    pub notifications: broadcast::Receiver<Notification>,
    pub factory: MockFactory,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(MediaConfig::default())
    }

    pub fn with_config(config: MediaConfig) -> Self {
        let factory = MockFactory::default();
        let bus = EventBus::new(100);
        let notifications = bus.subscribe();
        let (engine, rx) = SyncEngine::new(Arc::new(config), Box::new(factory.clone()), bus);
        Self {
            engine,
            rx,
            notifications,
            factory,
        }
    }

    /// Process everything queued so far
    pub fn drain(&mut self) {
        self.engine.drain(&mut self.rx);
    }

    pub fn send(&mut self, command: HostCommand) {
        self.engine.handle_command(command);
        self.drain();
    }

    pub fn init(&mut self, handle: impl Into<Handle>, options: Options) {
        self.send(HostCommand::Init {
            handle: handle.into(),
            options,
        });
    }

    pub fn stop(&mut self, handle: impl Into<Handle>) {
        self.send(HostCommand::Stop {
            handle: handle.into(),
        });
    }

    pub fn update(&mut self, frame: UpdateFrame) {
        self.send(HostCommand::Update(frame));
    }

    pub fn entity(&self, handle: impl Into<Handle>) -> Option<&PlaybackEntity> {
        self.engine.registry().resolve(&handle.into())
    }

    pub fn primary(&self, handle: impl Into<Handle>) -> Created {
        self.factory
            .latest(&handle.into(), SourceRole::Primary)
            .expect("no primary backend created")
    }

    pub fn ambience(&self, handle: impl Into<Handle>) -> Option<Created> {
        self.factory.latest(&handle.into(), SourceRole::Ambience)
    }

    /// Fire a backend callback through the backend's own sink
    pub fn fire(&mut self, created: &Created, event: BackendEvent) {
        assert!(created.sink.emit(event));
        self.drain();
    }

    /// Mark the primary backend ready and deliver its readiness callback
    pub fn make_ready(&mut self, handle: impl Into<Handle>) {
        let created = self.primary(handle);
        created.with_state(|s| s.ready = true);
        self.fire(&created, BackendEvent::Ready);
    }

    /// Ready, then report playback started
    pub fn start(&mut self, handle: impl Into<Handle> + Clone) {
        self.make_ready(handle.clone());
        let created = self.primary(handle);
        self.fire(&created, BackendEvent::Playing);
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = self.notifications.try_recv() {
            out.push(n);
        }
        out
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Options from the reference scenario: diffRoom 0.5, diffRoomVolume 0.3, range 50
pub fn scenario_options(url: &str) -> Options {
    let mut options = Options::with_url(url);
    options.attenuation = Attenuation {
        same_room: 0.0,
        diff_room: 0.5,
    };
    options.diff_room_volume = 0.3;
    options.range = Some(50.0);
    options
}

pub fn frame(handle: impl Into<Handle>, distance: f64, same_room: bool, options: Options) -> UpdateFrame {
    UpdateFrame {
        handle: handle.into(),
        distance,
        volume: 100.0,
        same_room,
        options,
    }
}

/// Integer handle shorthand
pub fn h(id: i64) -> Handle {
    Handle::Id(id)
}
