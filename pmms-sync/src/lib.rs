//! # PMMS Sync Engine (pmms-sync)
//!
//! Spatialized playback synchronization for remote media sources.
//!
//! **Purpose:** Own one playback entity per host handle, smooth attenuation
//! and volume toward the host's positional targets every update tick, keep
//! each source's transport aligned with the server-authoritative offset, and
//! report readiness and failures back to the host.
//!
//! **Architecture:** A single engine task consumes one ordered event queue
//! (host commands + backend callbacks); media backends sit behind the
//! [`backend::MediaBackend`] trait; the host bridge is an axum HTTP/SSE
//! service.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod playback;

pub use error::{Error, Result};
pub use playback::{EngineHandle, SyncEngine};
