//! Event types for the PMMS event system
//!
//! Inbound host commands live in [`host_types`]; outbound notifications and
//! the EventBus that distributes them are defined here.

mod host_types;

pub use host_types::{Attenuation, Handle, HostCommand, Options, UpdateFrame};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Outbound notification to the host (fire-and-forget, JSON key/value payload)
///
/// Notifications are broadcast via EventBus; the host bridge forwards them
/// over SSE and, when configured, as HTTP callbacks named after [`Notification::name`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
    /// Backend failed before first readiness; the entity was discarded
    #[serde(rename = "initError")]
    InitError {
        /// URL exactly as the host supplied it
        url: String,
        message: String,
    },

    /// Backend became ready; `options` carries the finalized timeline
    #[serde(rename = "init")]
    Init { handle: Handle, options: Options },

    /// Runtime backend error after readiness; the entity is retained
    #[serde(rename = "playError")]
    PlayError { url: String, message: String },

    /// Reply to a `DuiBrowser:init` request
    #[serde(rename = "DuiBrowser:initDone")]
    BrowserInitDone { handle: Handle },
}

impl Notification {
    /// Wire name, used as SSE event name and callback path segment
    pub fn name(&self) -> &'static str {
        match self {
            Notification::InitError { .. } => "initError",
            Notification::Init { .. } => "init",
            Notification::PlayError { .. } => "playError",
            Notification::BrowserInitDone { .. } => "DuiBrowser:initDone",
        }
    }

    /// Payload without the `type` discriminator
    pub fn payload(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.remove("type");
        }
        value
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Distribution bus for outbound notifications
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the engine)
/// - Multiple concurrent subscribers (SSE clients, HTTP forwarder)
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use pmms_common::events::{EventBus, Notification, Handle};
///
/// let bus = EventBus::new(100);
/// let mut rx = bus.subscribe();
///
/// bus.emit(Notification::BrowserInitDone { handle: Handle::Id(1) }).ok();
/// assert_eq!(rx.try_recv().unwrap().name(), "DuiBrowser:initDone");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Notification>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` notifications
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Emit a notification to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        notification: Notification,
    ) -> Result<usize, broadcast::error::SendError<Notification>> {
        self.tx.send(notification)
    }

    /// Emit a notification, ignoring the no-subscriber case
    pub fn emit_lossy(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
