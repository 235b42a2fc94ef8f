//! Headless, clock-driven media backend
//!
//! Used by the service binary when no real rendering surface is attached.
//! Readiness arrives asynchronously after a configurable delay through the
//! engine queue, exactly like a real media element's `canplay`; sources
//! with unsupported schemes report a load error instead.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::{
    extract_youtube_video_id, BackendEventSink, BackendFactory, BackendKind, BackendRequest,
    MediaBackend, MediaSource, ReadyState, VideoMetadata,
};
use crate::error::{Error, Result};
use crate::events::BackendEvent;
use crate::playback::clock;
use crate::playback::effects::{FilterKind, FilterProfile, VisualizationConfig};

const SUPPORTED_SCHEMES: [&str; 3] = ["http", "https", "file"];

pub struct SimulatedBackend {
    element_id: String,
    source: MediaSource,
    ready: Arc<AtomicU8>,
    duration: Option<f64>,
    /// Position at the last play/pause/seek
    base_position: f64,
    /// Set while playing
    started_at: Option<Instant>,
    volume: f64,
    sink: BackendEventSink,
    filter: Option<FilterKind>,
    visualization: Option<String>,
    loader: Option<JoinHandle<()>>,
    released: bool,
}

impl SimulatedBackend {
    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    pub fn filter(&self) -> Option<FilterKind> {
        self.filter
    }

    pub fn visualization(&self) -> Option<&str> {
        self.visualization.as_deref()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl MediaBackend for SimulatedBackend {
    fn kind(&self) -> BackendKind {
        self.source.kind
    }

    fn element_id(&self) -> &str {
        &self.element_id
    }

    fn ready_state(&self) -> ReadyState {
        if self.ready.load(Ordering::Acquire) > 0 {
            ReadyState::HaveEnoughData
        } else {
            ReadyState::HaveNothing
        }
    }

    fn duration(&self) -> Option<f64> {
        if self.ready_state().is_ready() {
            self.duration
        } else {
            None
        }
    }

    fn current_position(&self) -> f64 {
        let elapsed = self
            .started_at
            .map(|at| at.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let position = self.base_position + elapsed;
        self.duration
            .and_then(|d| clock::target_position(position, d))
            .unwrap_or(position)
    }

    fn seek(&mut self, position: f64) {
        self.base_position = position.max(0.0);
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
        trace!(element = %self.element_id, position, "Seek");
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn is_paused(&self) -> bool {
        self.started_at.is_none()
    }

    fn play(&mut self) {
        if self.released || !self.ready_state().is_ready() || self.started_at.is_some() {
            return;
        }
        self.started_at = Some(Instant::now());
        self.sink.emit(BackendEvent::Playing);
    }

    fn pause(&mut self) {
        if self.started_at.is_some() {
            self.base_position = self.current_position();
            self.started_at = None;
        }
    }

    fn video_metadata(&self) -> Option<VideoMetadata> {
        if self.source.kind != BackendKind::EmbeddedPlatform {
            return None;
        }
        let video_id = extract_youtube_video_id(&self.source.resolved).map(str::to_string);
        Some(VideoMetadata {
            title: video_id.as_ref().map(|id| format!("YouTube video {}", id)),
            video_id,
        })
    }

    fn attach_filter(&mut self, profile: &FilterProfile) -> Result<()> {
        self.filter = Some(profile.kind);
        debug!(element = %self.element_id, kind = ?profile.kind, "Simulated filter attached");
        Ok(())
    }

    fn attach_visualization(&mut self, config: &VisualizationConfig) -> Result<()> {
        self.visualization = config.kind().map(str::to_string);
        Ok(())
    }

    fn release(&mut self) {
        if let Some(loader) = self.loader.take() {
            loader.abort();
        }
        self.pause();
        self.released = true;
    }
}

/// Creates [`SimulatedBackend`]s on the current tokio runtime
#[derive(Debug, Clone)]
pub struct SimulatedBackendFactory {
    ready_delay: Duration,
    default_duration: f64,
}

impl SimulatedBackendFactory {
    pub fn new(ready_delay: Duration, default_duration: f64) -> Self {
        Self {
            ready_delay,
            default_duration,
        }
    }

    fn duration_for(&self, kind: BackendKind) -> Option<f64> {
        match kind {
            BackendKind::AdaptiveStream => Some(f64::INFINITY),
            BackendKind::Html5 | BackendKind::EmbeddedPlatform => Some(self.default_duration),
        }
    }
}

fn scheme_supported(resolved: &str) -> bool {
    resolved
        .split_once("://")
        .map(|(scheme, _)| SUPPORTED_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl BackendFactory for SimulatedBackendFactory {
    fn create(
        &self,
        request: BackendRequest,
        events: BackendEventSink,
    ) -> Result<Box<dyn MediaBackend>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Backend(format!("no async runtime for backend loader: {}", e)))?;

        let ready = Arc::new(AtomicU8::new(0));
        let supported = scheme_supported(&request.source.resolved);

        let loader = {
            let ready = Arc::clone(&ready);
            let sink = events.clone();
            let delay = self.ready_delay;
            runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                if supported {
                    ready.store(ReadyState::HaveEnoughData as u8, Ordering::Release);
                    sink.emit(BackendEvent::Ready);
                } else {
                    sink.emit(BackendEvent::Error {
                        message: "MEDIA_ERR_SRC_NOT_SUPPORTED".to_string(),
                    });
                }
            })
        };

        debug!(
            element = %request.element_id,
            url = %request.source.resolved,
            kind = ?request.source.kind,
            "Simulated backend created"
        );

        Ok(Box::new(SimulatedBackend {
            element_id: request.element_id,
            duration: self.duration_for(request.source.kind),
            source: request.source,
            ready,
            base_position: 0.0,
            started_at: None,
            volume: 1.0,
            sink: events,
            filter: None,
            visualization: None,
            loader: Some(loader),
            released: false,
        }))
    }
}
