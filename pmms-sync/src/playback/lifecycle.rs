//! Per-entity lifecycle state machine
//!
//! ```text
//! Created ──adapter created──▶ AwaitingReady ──ready──▶ Ready(Playing) ◀──▶ Ready(Paused)
//!                                   │                        │
//!                                 error                    error
//!                                   ▼                        ▼
//!                            Error (torn down)        Error (retained, may recover)
//!
//! any state ──stop──▶ Destroyed (terminal)
//! ```
//!
//! Playing/Paused within Ready are driven by the scheduler's range
//! decisions, never directly by host commands.

use pmms_common::events::Options;
use serde::Serialize;

/// Transport sub-state of a ready entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Playing,
    Paused,
}

/// Lifecycle state of one playback entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "transport", rename_all = "snake_case")]
pub enum LifecycleState {
    Created,
    AwaitingReady,
    Ready(Transport),
    Error,
    Destroyed,
}

/// Inputs driving the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    AdapterCreated,
    BackendReady,
    BackendError,
    /// Backend reports playback running (initial start or recovery)
    PlaybackStarted,
    /// Scheduler paused an out-of-range source
    RangePaused,
    /// Scheduler resumed an in-range source
    RangeResumed,
    Stopped,
}

/// Rejected lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: LifecycleState,
    pub event: LifecycleEvent,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} cannot handle {:?}", self.from, self.event)
    }
}

impl std::error::Error for InvalidTransition {}

impl LifecycleState {
    /// Compute the successor state for `event`
    pub fn transition(self, event: LifecycleEvent) -> Result<LifecycleState, InvalidTransition> {
        use LifecycleEvent as E;
        use LifecycleState as S;

        let next = match (self, event) {
            (S::Destroyed, _) => None,
            (_, E::Stopped) => Some(S::Destroyed),

            (S::Created, E::AdapterCreated) => Some(S::AwaitingReady),
            (S::AwaitingReady, E::BackendReady) => Some(S::Ready(Transport::Playing)),
            (S::AwaitingReady, E::BackendError) => Some(S::Error),

            (S::Ready(_), E::BackendError) => Some(S::Error),
            (S::Ready(_), E::PlaybackStarted) => Some(S::Ready(Transport::Playing)),
            (S::Ready(_), E::RangeResumed) => Some(S::Ready(Transport::Playing)),
            (S::Ready(_), E::RangePaused) => Some(S::Ready(Transport::Paused)),

            (S::Error, E::BackendError) => Some(S::Error),
            (S::Error, E::PlaybackStarted) => Some(S::Ready(Transport::Playing)),
            (S::Error, E::RangeResumed) => Some(S::Error),
            (S::Error, E::RangePaused) => Some(S::Error),

            _ => None,
        };

        next.ok_or(InvalidTransition { from: self, event })
    }

    /// Whether the state belongs to `Ready`
    pub fn is_ready(&self) -> bool {
        matches!(self, LifecycleState::Ready(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::AwaitingReady => "awaiting_ready",
            LifecycleState::Ready(Transport::Playing) => "playing",
            LifecycleState::Ready(Transport::Paused) => "paused",
            LifecycleState::Error => "error",
            LifecycleState::Destroyed => "destroyed",
        }
    }
}

/// Whether a reported duration describes a finite, known timeline
///
/// Unknown (`None`), not-a-number, infinite and zero durations are all
/// rejected; NaN is tested explicitly rather than by equality.
pub fn usable_duration(duration: Option<f64>) -> Option<f64> {
    duration.filter(|d| !d.is_nan() && d.is_finite() && *d > 0.0)
}

/// Derive the effective timeline policy at first readiness
///
/// Sources without a usable duration, and live streams, play from zero
/// with no timeline and no looping.
pub fn finalize_timeline(options: &mut Options, reported_duration: Option<f64>, is_live: bool) {
    match usable_duration(reported_duration) {
        Some(duration) if !is_live => {
            options.duration = Some(duration);
        }
        _ => {
            options.offset = 0.0;
            options.duration = None;
            options.looped = false;
        }
    }
}
