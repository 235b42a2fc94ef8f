//! # PMMS Common Library
//!
//! Shared code between the host bridge and the synchronization engine:
//! - Wire types for host commands and outbound notifications
//! - Playback options snapshot (attenuation, range, timeline)
//! - Notification EventBus
//! - Bootstrap configuration loading
//! - Timecode parsing

pub mod config;
pub mod error;
pub mod events;
pub mod timecode;

pub use error::{Error, Result};
pub use events::{EventBus, Handle, HostCommand, Notification, Options, UpdateFrame};
