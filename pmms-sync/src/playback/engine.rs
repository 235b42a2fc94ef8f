//! Synchronization engine
//!
//! A single task owns the [`EntityRegistry`] and processes every
//! [`EngineEvent`] in arrival order: host commands from the bridge, backend
//! callbacks from media backends, and diagnostic requests. No handler ever
//! blocks, and no handler can observe a half-built or half-removed entity.
//!
//! # Event flow
//!
//! ```text
//! HTTP bridge ──HostCommand──┐
//!                            ├──▶ queue ──▶ SyncEngine ──Notification──▶ EventBus
//! backends ──BackendEnvelope─┘                  │
//!                                               └──▶ MediaBackend (play/pause/seek/volume)
//! ```

use std::sync::Arc;

use pmms_common::events::{Handle, HostCommand, Options, UpdateFrame};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use super::entity::{EntitySnapshot, PlaybackEntity};
use super::registry::EntityRegistry;
use crate::backend::{resolve_media_source, BackendEventSink, BackendFactory, BackendRequest};
use crate::config::MediaConfig;
use crate::error::{Error, Result};
use crate::events::{
    BackendEnvelope, BackendEvent, EngineEvent, EventBus, Notification, SourceRole,
};

/// Cloneable submission side of the engine queue
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineHandle {
    /// Enqueue a host command (fire-and-forget)
    pub fn submit(&self, command: HostCommand) -> Result<()> {
        self.tx
            .send(EngineEvent::Host(command))
            .map_err(|_| Error::EngineUnavailable("event queue closed".to_string()))
    }

    /// Ask the engine task for a registry snapshot
    pub async fn snapshot(&self) -> Result<Vec<EntitySnapshot>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineEvent::Snapshot(reply_tx))
            .map_err(|_| Error::EngineUnavailable("event queue closed".to_string()))?;
        reply_rx
            .await
            .map_err(|_| Error::EngineUnavailable("engine dropped snapshot request".to_string()))
    }

    /// Ask the engine task to release everything and stop
    pub fn shutdown(&self) -> Result<()> {
        self.tx
            .send(EngineEvent::Shutdown)
            .map_err(|_| Error::EngineUnavailable("event queue closed".to_string()))
    }

    /// Raw queue sender, for components that produce backend events
    pub fn sender(&self) -> mpsc::UnboundedSender<EngineEvent> {
        self.tx.clone()
    }
}

pub struct SyncEngine {
    config: Arc<MediaConfig>,
    registry: EntityRegistry,
    factory: Box<dyn BackendFactory>,
    queue_tx: mpsc::UnboundedSender<EngineEvent>,
    bus: EventBus,
}

impl SyncEngine {
    /// Create the engine and the receiving end of its event queue
    pub fn new(
        config: Arc<MediaConfig>,
        factory: Box<dyn BackendFactory>,
        bus: EventBus,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let engine = Self {
            config,
            registry: EntityRegistry::new(),
            factory,
            queue_tx,
            bus,
        };
        (engine, queue_rx)
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.queue_tx.clone(),
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Process events until shutdown is requested
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<EngineEvent>) {
        info!("Sync engine started");
        while let Some(event) = rx.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }
        self.registry.clear();
        info!("Sync engine stopped");
    }

    /// Process every event already queued, without waiting for more
    ///
    /// Returns the number of events handled.
    pub fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> usize {
        let mut handled = 0;
        while let Ok(event) = rx.try_recv() {
            handled += 1;
            if !self.handle_event(event) {
                break;
            }
        }
        handled
    }

    /// Process one event; returns `false` once the engine should stop
    pub fn handle_event(&mut self, event: EngineEvent) -> bool {
        trace!(event = event.label(), "Engine event");
        match event {
            EngineEvent::Host(command) => self.handle_command(command),
            EngineEvent::Backend(envelope) => self.handle_backend_event(envelope),
            EngineEvent::Snapshot(reply) => {
                let _ = reply.send(self.registry.snapshots());
            }
            EngineEvent::Shutdown => return false,
        }
        true
    }

    // ========================================
    // Host commands
    // ========================================

    pub fn handle_command(&mut self, command: HostCommand) {
        match command {
            HostCommand::Init { handle, options } => self.init(handle, options),
            HostCommand::Play { handle } => self.play(&handle),
            HostCommand::Stop { handle } => self.stop(&handle),
            HostCommand::Update(frame) => self.update(&frame),
            HostCommand::BrowserInit { handle } => {
                self.notify(Notification::BrowserInitDone { handle });
            }
        }
    }

    fn init(&mut self, handle: Handle, mut options: Options) {
        if options.url.trim().is_empty() {
            debug!(handle = %handle, "Ignoring init with empty URL");
            return;
        }
        if options.title.is_empty() {
            options.title = options.url.clone();
        }
        if self.registry.contains(&handle) {
            debug!(handle = %handle, "Entity already exists, init ignored");
            return;
        }

        let config = Arc::clone(&self.config);
        let factory = &self.factory;
        let queue_tx = self.queue_tx.clone();

        let created = self
            .registry
            .resolve_or_create(&handle, &options, |generation| {
                let source = resolve_media_source(&options.url, &config)?;
                let sink =
                    BackendEventSink::new(queue_tx, handle.clone(), generation, SourceRole::Primary);
                let request = BackendRequest {
                    element_id: format!("player_{}", handle),
                    source: source.clone(),
                };
                let backend = factory.create(request, sink)?;
                Ok(PlaybackEntity::new(
                    handle.clone(),
                    generation,
                    source,
                    options.clone(),
                    backend,
                ))
            })
            .map(|entity| entity.map(|e| (e.generation(), e.source().resolved.clone())));

        match created {
            Ok(Some((generation, resolved))) => {
                info!(handle = %handle, generation, url = %options.url, resolved = %resolved, "Created playback entity");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(handle = %handle, url = %options.url, "Failed to create playback entity: {}", e);
                self.notify(Notification::InitError {
                    url: options.url,
                    message: e.to_string(),
                });
            }
        }
    }

    fn play(&mut self, handle: &Handle) {
        match self.registry.resolve(handle) {
            Some(entity) => debug!(handle = %handle, state = entity.state().name(), "Play resolved entity"),
            None => debug!(handle = %handle, "Play for unknown handle ignored"),
        }
    }

    fn stop(&mut self, handle: &Handle) {
        if self.registry.remove(handle) {
            info!(handle = %handle, "Stopped playback entity");
        } else {
            debug!(handle = %handle, "Stop for unknown handle ignored");
        }
    }

    fn update(&mut self, frame: &UpdateFrame) {
        match self.registry.resolve_mut(&frame.handle) {
            Some(entity) => entity.tick(frame),
            None => trace!(handle = %frame.handle, "Update for unknown handle dropped"),
        }
    }

    // ========================================
    // Backend callbacks
    // ========================================

    pub fn handle_backend_event(&mut self, envelope: BackendEnvelope) {
        let BackendEnvelope {
            handle,
            generation,
            role,
            event,
        } = envelope;

        if self
            .registry
            .resolve_generation_mut(&handle, generation)
            .is_none()
        {
            debug!(handle = %handle, generation, ?role, "Discarding stale backend event");
            return;
        }

        match role {
            SourceRole::Primary => self.on_primary_event(&handle, generation, event),
            SourceRole::Ambience => self.on_ambience_event(&handle, generation, event),
        }
    }

    fn on_primary_event(&mut self, handle: &Handle, generation: u64, event: BackendEvent) {
        let Some(entity) = self.registry.resolve_generation_mut(handle, generation) else {
            return;
        };

        match event {
            BackendEvent::Ready => {
                if let Some(notification) = entity.on_ready() {
                    self.notify(notification);
                }
            }
            BackendEvent::Error { message } => {
                let url = entity.url().to_string();
                if entity.is_initialized() {
                    entity.on_error();
                    warn!(handle = %handle, url = %url, "Playback error: {}", message);
                    self.notify(Notification::PlayError { url, message });
                } else {
                    warn!(handle = %handle, url = %url, "Media failed to load: {}", message);
                    self.registry.remove(handle);
                    self.notify(Notification::InitError { url, message });
                }
            }
            BackendEvent::Playing => {
                if !entity.on_playing() {
                    return;
                }
                let profile = entity.attach_filter_once(&self.config);
                entity.attach_visualization_once(&self.config);

                if let Some(noise_url) = profile.and_then(|p| p.ambience_url) {
                    self.attach_ambience(handle, generation, &noise_url);
                }
            }
        }
    }

    fn on_ambience_event(&mut self, handle: &Handle, generation: u64, event: BackendEvent) {
        let Some(entity) = self.registry.resolve_generation_mut(handle, generation) else {
            return;
        };

        match event {
            BackendEvent::Ready => entity.on_ambience_ready(),
            BackendEvent::Error { message } => {
                warn!(handle = %handle, "Ambience layer failed: {}", message);
                entity.detach_ambience();
            }
            BackendEvent::Playing => {}
        }
    }

    fn attach_ambience(&mut self, handle: &Handle, generation: u64, url: &str) {
        let layer = resolve_media_source(url, &self.config).and_then(|source| {
            let sink = BackendEventSink::new(
                self.queue_tx.clone(),
                handle.clone(),
                generation,
                SourceRole::Ambience,
            );
            let request = BackendRequest {
                element_id: format!("player_{}_noise", handle),
                source,
            };
            self.factory.create(request, sink)
        });

        match (layer, self.registry.resolve_generation_mut(handle, generation)) {
            (Ok(layer), Some(entity)) => {
                entity.attach_ambience(layer);
                debug!(handle = %handle, url, "Ambience layer attached");
            }
            (Ok(mut layer), None) => layer.release(),
            (Err(e), _) => warn!(handle = %handle, url, "Failed to create ambience layer: {}", e),
        }
    }

    fn notify(&self, notification: Notification) {
        debug!(
            notification = notification.name(),
            subscribers = self.bus.subscriber_count(),
            "Emitting notification"
        );
        self.bus.emit_lossy(notification);
    }
}
