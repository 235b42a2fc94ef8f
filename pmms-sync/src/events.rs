//! Internal event system for pmms-sync
//!
//! All state changes are serialized through one unbounded MPSC queue owned
//! by the engine task:
//! - **Host commands** arrive from the HTTP bridge
//! - **Backend callbacks** (ready / playing / error) arrive from media
//!   backends, tagged with the generation of the entity that owns them
//! - **Diagnostics** requests carry a oneshot reply channel
//!
//! Outbound notifications use the shared EventBus from pmms-common.

use pmms_common::events::{Handle, HostCommand};
use tokio::sync::oneshot;

use crate::playback::EntitySnapshot;

// ========================================
// Re-exports from pmms-common
// ========================================

pub use pmms_common::events::{EventBus, Notification};

// ========================================
// Internal Events (pmms-sync only)
// ========================================

/// Which media instance of an entity a backend callback concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRole {
    /// The entity's own media
    Primary,
    /// Ancillary ambience layer (e.g. phonograph noise)
    Ambience,
}

/// Asynchronous readiness/error signal from a media backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// First readiness (enough data to start playback)
    Ready,
    /// Playback actually started or resumed
    Playing,
    /// Load, decode or runtime failure
    Error { message: String },
}

/// Backend callback addressed to one specific entity instance
#[derive(Debug, Clone, PartialEq)]
pub struct BackendEnvelope {
    pub handle: Handle,
    /// Generation of the entity the backend was created for
    pub generation: u64,
    pub role: SourceRole,
    pub event: BackendEvent,
}

/// Everything the engine task processes, in arrival order
#[derive(Debug)]
pub enum EngineEvent {
    Host(HostCommand),
    Backend(BackendEnvelope),
    Snapshot(oneshot::Sender<Vec<EntitySnapshot>>),
    Shutdown,
}

impl EngineEvent {
    /// Short label for tracing
    pub fn label(&self) -> &'static str {
        match self {
            EngineEvent::Host(cmd) => cmd.name(),
            EngineEvent::Backend(env) => match env.event {
                BackendEvent::Ready => "backend:ready",
                BackendEvent::Playing => "backend:playing",
                BackendEvent::Error { .. } => "backend:error",
            },
            EngineEvent::Snapshot(_) => "snapshot",
            EngineEvent::Shutdown => "shutdown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_labels() {
        let ev = EngineEvent::Host(HostCommand::Stop { handle: Handle::Id(1) });
        assert_eq!(ev.label(), "stop");

        let ev = EngineEvent::Backend(BackendEnvelope {
            handle: Handle::Id(1),
            generation: 3,
            role: SourceRole::Primary,
            event: BackendEvent::Error {
                message: "MEDIA_ERR_DECODE".into(),
            },
        });
        assert_eq!(ev.label(), "backend:error");
        assert_eq!(EngineEvent::Shutdown.label(), "shutdown");
    }
}
