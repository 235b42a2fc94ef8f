//! Playback synchronization core
//!
//! - `registry`: at most one entity per handle, creation on demand
//! - `lifecycle`: per-entity state machine driven by backend callbacks
//! - `scheduler`: attenuation / volume smoothing per update tick
//! - `clock`: drift correction against the authoritative offset
//! - `effects`: one-shot filter and visualization attachments
//! - `engine`: the single task tying them together

pub mod clock;
pub mod effects;
pub mod engine;
pub mod entity;
pub mod lifecycle;
pub mod registry;
pub mod scheduler;

pub use engine::{EngineHandle, SyncEngine};
pub use entity::{EntitySnapshot, PlaybackEntity};
pub use lifecycle::{LifecycleState, Transport};
pub use registry::EntityRegistry;
