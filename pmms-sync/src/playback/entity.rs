//! Playback entity: one per active handle
//!
//! Owns the media backend (plus an optional ambience layer) and the
//! synchronization state the scheduler works on. Every playback command
//! issued to the backend is gated on readiness.

use pmms_common::events::{Handle, Notification, Options, UpdateFrame};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use super::clock;
use super::effects::{resolve_visualization, FilterProfile};
use super::lifecycle::{finalize_timeline, LifecycleEvent, LifecycleState, Transport};
use super::scheduler::{self, Smoothing, TickAction};
use crate::backend::{BackendKind, MediaBackend, MediaSource};
use crate::config::MediaConfig;

/// Diagnostic view of one entity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnapshot {
    pub handle: Handle,
    pub generation: u64,
    pub url: String,
    pub resolved_url: String,
    pub backend: BackendKind,
    pub state: &'static str,
    pub initialized: bool,
    pub attenuation_factor: f64,
    pub volume_factor: f64,
    pub volume: f64,
    pub position: f64,
    pub duration: Option<f64>,
    pub paused: bool,
    pub filter_applied: bool,
    pub visualization_applied: bool,
    pub ambience: bool,
}

pub struct PlaybackEntity {
    handle: Handle,
    generation: u64,
    source: MediaSource,
    options: Options,
    backend: Box<dyn MediaBackend>,
    ambience: Option<Box<dyn MediaBackend>>,
    state: LifecycleState,
    initialized: bool,
    smoothing: Smoothing,
    filter_applied: bool,
    visualization_applied: bool,
}

impl std::fmt::Debug for PlaybackEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEntity")
            .field("handle", &self.handle)
            .field("generation", &self.generation)
            .field("url", &self.source.original)
            .field("state", &self.state)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl PlaybackEntity {
    /// Wrap a freshly created backend
    ///
    /// Factors start at the different-room targets and the backend is
    /// silenced until the scheduler computes a real volume.
    pub fn new(
        handle: Handle,
        generation: u64,
        source: MediaSource,
        options: Options,
        mut backend: Box<dyn MediaBackend>,
    ) -> Self {
        let smoothing = Smoothing {
            attenuation_factor: options.attenuation.diff_room.clamp(0.0, 1.0),
            volume_factor: options.diff_room_volume.clamp(0.0, 1.0),
        };
        backend.set_volume(0.0);

        let mut entity = Self {
            handle,
            generation,
            source,
            options,
            backend,
            ambience: None,
            state: LifecycleState::Created,
            initialized: false,
            smoothing,
            filter_applied: false,
            visualization_applied: false,
        };
        entity.advance(LifecycleEvent::AdapterCreated);
        entity
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Media URL exactly as the host supplied it
    pub fn url(&self) -> &str {
        &self.source.original
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn smoothing(&self) -> Smoothing {
        self.smoothing
    }

    pub fn filter_applied(&self) -> bool {
        self.filter_applied
    }

    pub fn visualization_applied(&self) -> bool {
        self.visualization_applied
    }

    pub fn has_ambience(&self) -> bool {
        self.ambience.is_some()
    }

    pub fn backend(&self) -> &dyn MediaBackend {
        self.backend.as_ref()
    }

    /// Whether play/seek/volume commands may be issued to the backend
    pub fn is_commandable(&self) -> bool {
        self.initialized && self.backend.ready_state().is_ready()
    }

    fn advance(&mut self, event: LifecycleEvent) {
        match self.state.transition(event) {
            Ok(next) => {
                if next != self.state {
                    trace!(
                        handle = %self.handle,
                        generation = self.generation,
                        from = self.state.name(),
                        to = next.name(),
                        "Lifecycle transition"
                    );
                }
                self.state = next;
            }
            Err(e) => debug!(handle = %self.handle, "Ignored lifecycle event: {}", e),
        }
    }

    // ========================================
    // Backend callbacks
    // ========================================

    /// First readiness: finalize the timeline and start playback
    ///
    /// Returns the `init` notification, or `None` when already initialized.
    pub fn on_ready(&mut self) -> Option<Notification> {
        if self.initialized {
            return None;
        }

        finalize_timeline(
            &mut self.options,
            self.backend.duration(),
            self.backend.is_live(),
        );

        if let Some(title) = self.backend.video_metadata().and_then(|meta| meta.title) {
            self.options.title = title;
        }
        self.options.video = true;
        self.options.video_size = 0.0;

        self.initialized = true;
        self.advance(LifecycleEvent::BackendReady);

        info!(
            handle = %self.handle,
            generation = self.generation,
            duration = ?self.options.duration,
            "Media ready, starting playback"
        );
        self.play();

        Some(Notification::Init {
            handle: self.handle.clone(),
            options: self.options.clone(),
        })
    }

    /// Playback actually started; returns whether effects may be attached
    pub fn on_playing(&mut self) -> bool {
        if !self.initialized {
            return false;
        }
        self.advance(LifecycleEvent::PlaybackStarted);
        true
    }

    /// Runtime failure after readiness; the entity is retained
    pub fn on_error(&mut self) {
        self.advance(LifecycleEvent::BackendError);
    }

    // ========================================
    // One-shot attachments
    // ========================================

    /// Attach the audio-shaping filter on first playback
    ///
    /// Returns the profile when it was attached by this call, so the caller
    /// can provision the ambience layer it asks for.
    pub fn attach_filter_once(&mut self, config: &MediaConfig) -> Option<FilterProfile> {
        if !self.options.filter || self.filter_applied {
            return None;
        }
        self.filter_applied = true;

        let profile = FilterProfile::for_config(config);
        if let Err(e) = self.backend.attach_filter(&profile) {
            warn!(handle = %self.handle, "Failed to attach audio filter: {}", e);
        } else {
            debug!(handle = %self.handle, kind = ?profile.kind, "Audio filter attached");
        }
        Some(profile)
    }

    /// Attach the visualization on first playback; `true` when attached now
    pub fn attach_visualization_once(&mut self, config: &MediaConfig) -> bool {
        let tag = match (&self.options.visualization, self.visualization_applied) {
            (Some(tag), false) => tag.clone(),
            _ => return false,
        };
        self.visualization_applied = true;

        let vis = resolve_visualization(&tag, config);
        if let Err(e) = self.backend.attach_visualization(&vis) {
            warn!(handle = %self.handle, tag = %tag, "Failed to attach visualization: {}", e);
        }
        true
    }

    // ========================================
    // Ambience layer
    // ========================================

    pub fn attach_ambience(&mut self, mut layer: Box<dyn MediaBackend>) {
        layer.set_volume(0.0);
        if let Some(mut previous) = self.ambience.replace(layer) {
            previous.release();
        }
    }

    pub fn detach_ambience(&mut self) {
        if let Some(mut layer) = self.ambience.take() {
            layer.release();
        }
    }

    /// Ambience finished loading: align it with the primary transport
    pub fn on_ambience_ready(&mut self) {
        let volume = self.backend.volume();
        let playing = self.is_commandable() && !self.backend.is_paused();
        if let Some(layer) = self.ambience.as_mut() {
            layer.set_volume(volume);
            if playing {
                layer.play();
            }
        }
    }

    fn ambience_ready_mut(&mut self) -> Option<&mut Box<dyn MediaBackend>> {
        self.ambience
            .as_mut()
            .filter(|layer| layer.ready_state().is_ready())
    }

    // ========================================
    // Transport (mirrored onto the ambience layer)
    // ========================================

    fn play(&mut self) {
        self.backend.play();
        if let Some(layer) = self.ambience_ready_mut() {
            layer.play();
        }
    }

    fn pause(&mut self) {
        self.backend.pause();
        if let Some(layer) = self.ambience_ready_mut() {
            layer.pause();
        }
    }

    fn set_volume(&mut self, volume: f64) {
        let volume = volume.clamp(0.0, 1.0);
        self.backend.set_volume(volume);
        if let Some(layer) = self.ambience_ready_mut() {
            layer.set_volume(volume);
        }
    }

    fn seek(&mut self, position: f64) {
        self.backend.seek(position);
        if let Some(layer) = self.ambience_ready_mut() {
            let wrapped = layer
                .duration()
                .and_then(|d| clock::target_position(position, d))
                .unwrap_or(position);
            layer.seek(wrapped);
        }
    }

    // ========================================
    // Update tick
    // ========================================

    /// Apply one host update frame
    ///
    /// Order: range pause, factor smoothing, volume, clock reconciliation,
    /// resume.
    pub fn tick(&mut self, frame: &UpdateFrame) {
        self.options = frame.options.clone();

        let current_volume = self.is_commandable().then(|| self.backend.volume());
        let plan = scheduler::plan_tick(self.smoothing, frame, current_volume);
        self.smoothing = plan.smoothing;

        match plan.action {
            TickAction::Pause => {
                if !self.backend.is_paused() {
                    self.pause();
                }
                if self.state == LifecycleState::Ready(Transport::Playing) {
                    self.advance(LifecycleEvent::RangePaused);
                }
            }
            TickAction::Audible { volume } => {
                if !self.is_commandable() {
                    return;
                }
                if let Some(volume) = volume {
                    self.set_volume(volume);
                }

                if let Some(position) = clock::reconcile(
                    frame.options.duration,
                    frame.options.offset,
                    self.backend.duration(),
                    self.backend.current_position(),
                ) {
                    debug!(
                        handle = %self.handle,
                        from = self.backend.current_position(),
                        to = position,
                        "Correcting clock drift"
                    );
                    self.seek(position);
                }

                if self.backend.is_paused() {
                    self.play();
                    if self.state.is_ready() {
                        self.advance(LifecycleEvent::RangeResumed);
                    }
                }
            }
        }
    }

    // ========================================
    // Teardown & diagnostics
    // ========================================

    /// Release the backend and every ancillary resource
    pub fn release(&mut self) {
        self.detach_ambience();
        self.backend.release();
        self.advance(LifecycleEvent::Stopped);
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            handle: self.handle.clone(),
            generation: self.generation,
            url: self.source.original.clone(),
            resolved_url: self.source.resolved.clone(),
            backend: self.backend.kind(),
            state: self.state.name(),
            initialized: self.initialized,
            attenuation_factor: self.smoothing.attenuation_factor,
            volume_factor: self.smoothing.volume_factor,
            volume: self.backend.volume(),
            position: self.backend.current_position(),
            duration: self.backend.duration().filter(|d| d.is_finite()),
            paused: self.backend.is_paused(),
            filter_applied: self.filter_applied,
            visualization_applied: self.visualization_applied,
            ambience: self.ambience.is_some(),
        }
    }
}
