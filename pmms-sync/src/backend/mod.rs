//! Media backend contract
//!
//! Every concrete media backend (HTML5-style element, adaptive stream
//! player, embedded platform player) is wrapped behind [`MediaBackend`], so
//! entity code never branches on the concrete kind. Backends report
//! readiness and errors asynchronously through a [`BackendEventSink`], which
//! feeds the engine's single event queue.

pub mod simulated;
pub mod source;

pub use simulated::{SimulatedBackend, SimulatedBackendFactory};
pub use source::{detect_kind, extract_youtube_video_id, resolve_media_source, MediaSource};

use pmms_common::events::Handle;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::events::{BackendEnvelope, BackendEvent, EngineEvent, SourceRole};
use crate::playback::effects::{FilterProfile, VisualizationConfig};

/// Concrete backend family a source is played through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Plain media element (files, progressive HTTP)
    Html5,
    /// Adaptive streaming player (HLS playlists), treated as live
    AdaptiveStream,
    /// Embedded video-platform player (YouTube, Twitch)
    EmbeddedPlatform,
}

/// Media element readiness, ordered like the HTML media `readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    /// Non-zero readiness: position and volume may be read and commanded
    pub fn is_ready(self) -> bool {
        self > ReadyState::HaveNothing
    }
}

/// Richer metadata exposed by platform players
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub title: Option<String>,
    pub video_id: Option<String>,
}

/// Uniform capability set over one media backend instance
pub trait MediaBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Identifier of the element or frame the media renders into
    fn element_id(&self) -> &str;

    fn ready_state(&self) -> ReadyState;

    /// Reported duration in seconds; `None` while unknown.
    /// May be `Some(f64::INFINITY)` or `Some(0.0)` for unbounded sources.
    fn duration(&self) -> Option<f64>;

    /// Current transport position in seconds
    fn current_position(&self) -> f64;

    fn seek(&mut self, position: f64);

    /// Output volume, 0.0-1.0
    fn volume(&self) -> f64;

    fn set_volume(&mut self, volume: f64);

    fn is_paused(&self) -> bool;

    fn play(&mut self);

    fn pause(&mut self);

    /// Whether the source is a live stream without a fixed timeline
    fn is_live(&self) -> bool {
        self.kind() == BackendKind::AdaptiveStream
    }

    fn video_metadata(&self) -> Option<VideoMetadata> {
        None
    }

    /// Route audio through the given shaping profile
    fn attach_filter(&mut self, profile: &FilterProfile) -> Result<()>;

    /// Attach a visual representation of the audio
    fn attach_visualization(&mut self, config: &VisualizationConfig) -> Result<()>;

    /// Stop everything and free the underlying resources
    fn release(&mut self);
}

/// Parameters for instantiating a backend
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub element_id: String,
    pub source: MediaSource,
}

/// Creates backends for new entities and ancillary layers
pub trait BackendFactory: Send {
    fn create(
        &self,
        request: BackendRequest,
        events: BackendEventSink,
    ) -> Result<Box<dyn MediaBackend>>;
}

/// Channel through which a backend reports its asynchronous events
///
/// Every event is stamped with the handle, generation and role the sink was
/// created for, so the engine can discard callbacks from torn-down entities.
#[derive(Debug, Clone)]
pub struct BackendEventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
    handle: Handle,
    generation: u64,
    role: SourceRole,
}

impl BackendEventSink {
    pub fn new(
        tx: mpsc::UnboundedSender<EngineEvent>,
        handle: Handle,
        generation: u64,
        role: SourceRole,
    ) -> Self {
        Self {
            tx,
            handle,
            generation,
            role,
        }
    }

    /// Queue an event for the engine; returns `false` if the engine is gone
    pub fn emit(&self, event: BackendEvent) -> bool {
        self.tx
            .send(EngineEvent::Backend(BackendEnvelope {
                handle: self.handle.clone(),
                generation: self.generation,
                role: self.role,
                event,
            }))
            .is_ok()
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn role(&self) -> SourceRole {
        self.role
    }
}
