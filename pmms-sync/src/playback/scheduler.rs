//! Attenuation & volume scheduling
//!
//! Pure functions of (current state, update frame) → next state, applied
//! once per update tick. Three quantities are smoothed independently:
//!
//! | Quantity           | Step per tick | Notes                                   |
//! |--------------------|---------------|-----------------------------------------|
//! | attenuation factor | 0.1           | room-dependent distance attenuation     |
//! | volume factor      | 0.01          | room-transition loudness scaling        |
//! | output volume      | 0.05          | only beyond the near field, dead band 0.1 |
//!
//! Within the near field (distance ≤ 100) the output volume snaps to its
//! target so close-range changes stay precise.

use pmms_common::events::UpdateFrame;

pub const ATTENUATION_STEP: f64 = 0.1;
pub const VOLUME_FACTOR_STEP: f64 = 0.01;
pub const VOLUME_FADE_STEP: f64 = 0.05;
/// Long-range fades only move while the gap exceeds this
pub const VOLUME_FADE_DEAD_BAND: f64 = 0.1;
/// Distances above this fade instead of snapping
pub const NEAR_FIELD_DISTANCE: f64 = 100.0;

/// Tolerance absorbing float accumulation when landing on a target
const SNAP_EPSILON: f64 = 1e-9;

/// Smoothed per-entity factors, both within 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothing {
    pub attenuation_factor: f64,
    pub volume_factor: f64,
}

/// What the engine must do to the backend this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickAction {
    /// Inaudible or out of range: pause if playing, nothing else
    Pause,
    /// In range: apply `volume` (when the backend is ready) and resume
    Audible { volume: Option<f64> },
}

/// Result of planning one update tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickPlan {
    pub smoothing: Smoothing,
    pub action: TickAction,
}

/// Move `current` toward `target` by at most `step`
///
/// Lands exactly on the target once within one step, so repeated ticks
/// never oscillate around it.
pub fn step_toward(current: f64, target: f64, step: f64) -> f64 {
    let gap = target - current;
    if gap.abs() <= step + SNAP_EPSILON {
        target
    } else if gap > 0.0 {
        current + step
    } else {
        current - step
    }
}

/// Whether the frame makes the source inaudible this tick
pub fn is_silenced(frame: &UpdateFrame) -> bool {
    frame.options.paused || frame.distance < 0.0 || frame.options.out_of_range(frame.distance)
}

/// Target (attenuation, volume factor) for the listener's room relation
pub fn room_targets(frame: &UpdateFrame) -> (f64, f64) {
    let attenuation = &frame.options.attenuation;
    let (att, vol) = if frame.same_room {
        (attenuation.same_room, 1.0)
    } else {
        (attenuation.diff_room, frame.options.diff_room_volume)
    };
    (att.clamp(0.0, 1.0), vol.clamp(0.0, 1.0))
}

/// Advance both smoothed factors by one tick
pub fn advance(smoothing: Smoothing, frame: &UpdateFrame) -> Smoothing {
    let (att_target, vol_target) = room_targets(frame);
    Smoothing {
        attenuation_factor: step_toward(smoothing.attenuation_factor, att_target, ATTENUATION_STEP)
            .clamp(0.0, 1.0),
        volume_factor: step_toward(smoothing.volume_factor, vol_target, VOLUME_FACTOR_STEP)
            .clamp(0.0, 1.0),
    }
}

/// Instantaneous target output volume (0.0-1.0)
pub fn target_volume(frame: &UpdateFrame, smoothing: &Smoothing) -> f64 {
    if frame.options.muted || frame.volume == 0.0 {
        return 0.0;
    }

    let distance_term = (100.0 - frame.distance * smoothing.attenuation_factor) / 100.0;
    let volume = distance_term * smoothing.volume_factor * (frame.volume / 100.0);
    volume.clamp(0.0, 1.0)
}

/// Next backend volume given the current one and this tick's target
pub fn next_volume(current: f64, target: f64, distance: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }

    if distance <= NEAR_FIELD_DISTANCE {
        return target;
    }

    if (current - target).abs() > VOLUME_FADE_DEAD_BAND {
        let stepped = if current > target {
            current - VOLUME_FADE_STEP
        } else {
            current + VOLUME_FADE_STEP
        };
        stepped.clamp(0.0, 1.0)
    } else {
        current
    }
}

/// Plan one update tick
///
/// `current_volume` is `Some` only when the backend reports readiness;
/// otherwise the factors still advance but no volume is produced.
pub fn plan_tick(smoothing: Smoothing, frame: &UpdateFrame, current_volume: Option<f64>) -> TickPlan {
    if is_silenced(frame) {
        return TickPlan {
            smoothing,
            action: TickAction::Pause,
        };
    }

    let smoothing = advance(smoothing, frame);
    let volume = current_volume.map(|current| {
        let target = target_volume(frame, &smoothing);
        next_volume(current, target, frame.distance)
    });

    TickPlan {
        smoothing,
        action: TickAction::Audible { volume },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmms_common::events::{Attenuation, Handle, Options};

    fn frame(distance: f64, same_room: bool) -> UpdateFrame {
        let mut options = Options::with_url("a.ogg");
        options.attenuation = Attenuation {
            same_room: 0.0,
            diff_room: 0.5,
        };
        options.diff_room_volume = 0.3;
        options.range = Some(50.0);
        UpdateFrame {
            handle: Handle::Id(1),
            distance,
            volume: 100.0,
            same_room,
            options,
        }
    }

    #[test]
    fn test_step_toward_lands_on_target() {
        assert_eq!(step_toward(0.0, 0.05, 0.1), 0.05);
        assert_eq!(step_toward(0.5, 0.5, 0.1), 0.5);
        assert_eq!(step_toward(1.0, 0.0, 0.1), 0.9);
        assert!((step_toward(0.0, 1.0, 0.01) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_attenuation_reaches_target_in_five_ticks() {
        let f = frame(10.0, false);
        let mut s = Smoothing {
            attenuation_factor: 0.0,
            volume_factor: 0.3,
        };

        for tick in 1..=10 {
            s = advance(s, &f);
            if tick < 5 {
                assert!(s.attenuation_factor < 0.5);
            } else {
                assert_eq!(s.attenuation_factor, 0.5, "tick {}", tick);
            }
        }
    }

    #[test]
    fn test_factors_are_monotonic_without_overshoot() {
        let f = frame(10.0, true);
        let mut s = Smoothing {
            attenuation_factor: 0.5,
            volume_factor: 0.3,
        };

        let mut prev = s;
        for _ in 0..200 {
            s = advance(s, &f);
            assert!(s.attenuation_factor <= prev.attenuation_factor);
            assert!(s.volume_factor >= prev.volume_factor);
            assert!(s.attenuation_factor >= 0.0);
            assert!(s.volume_factor <= 1.0);
            prev = s;
        }
        assert_eq!(s.attenuation_factor, 0.0);
        assert_eq!(s.volume_factor, 1.0);
    }

    #[test]
    fn test_silenced_conditions() {
        assert!(is_silenced(&frame(60.0, true)));
        assert!(is_silenced(&frame(-1.0, true)));

        let mut paused = frame(10.0, true);
        paused.options.paused = true;
        assert!(is_silenced(&paused));

        assert!(!is_silenced(&frame(50.0, true)));
    }

    #[test]
    fn test_pause_plan_keeps_factors() {
        let s = Smoothing {
            attenuation_factor: 0.2,
            volume_factor: 0.4,
        };
        let plan = plan_tick(s, &frame(60.0, false), Some(0.5));
        assert_eq!(plan.action, TickAction::Pause);
        assert_eq!(plan.smoothing, s);
    }

    #[test]
    fn test_target_volume_formula() {
        let f = frame(10.0, false);
        let s = Smoothing {
            attenuation_factor: 0.5,
            volume_factor: 0.3,
        };
        // ((100 - 10 * 0.5) / 100) * 0.3 * 1.0
        assert!((target_volume(&f, &s) - 0.285).abs() < 1e-12);

        let mut muted = f.clone();
        muted.options.muted = true;
        assert_eq!(target_volume(&muted, &s), 0.0);

        let mut quiet = f;
        quiet.volume = 0.0;
        assert_eq!(target_volume(&quiet, &s), 0.0);
    }

    #[test]
    fn test_target_volume_never_negative() {
        let mut f = frame(400.0, true);
        f.options.range = None;
        let s = Smoothing {
            attenuation_factor: 1.0,
            volume_factor: 1.0,
        };
        assert_eq!(target_volume(&f, &s), 0.0);
    }

    #[test]
    fn test_near_field_snaps_far_field_fades() {
        assert_eq!(next_volume(0.0, 0.8, 50.0), 0.8);
        assert!((next_volume(0.0, 0.8, 150.0) - 0.05).abs() < 1e-12);
        assert!((next_volume(0.8, 0.2, 150.0) - 0.75).abs() < 1e-12);
        // Inside the dead band nothing moves
        assert_eq!(next_volume(0.75, 0.8, 150.0), 0.75);
        // Zero target always snaps
        assert_eq!(next_volume(0.7, 0.0, 150.0), 0.0);
    }

    #[test]
    fn test_plan_without_ready_backend_has_no_volume() {
        let s = Smoothing {
            attenuation_factor: 0.0,
            volume_factor: 0.3,
        };
        let plan = plan_tick(s, &frame(10.0, false), None);
        assert_eq!(plan.action, TickAction::Audible { volume: None });
        assert!((plan.smoothing.attenuation_factor - 0.1).abs() < 1e-12);
    }
}
