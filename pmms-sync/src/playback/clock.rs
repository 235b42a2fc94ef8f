//! Clock reconciliation against the server-authoritative timeline
//!
//! The host's offset is the source of truth. The backend position is only
//! corrected when it drifts further than [`MAX_DRIFT_SECS`], so minor clock
//! jitter never causes constant seeking.

/// Drift tolerance in seconds
pub const MAX_DRIFT_SECS: f64 = 2.0;

/// Authoritative position within a media of `media_duration` seconds
///
/// Wraps offsets past the end (looping timelines) and never returns a
/// negative position. `None` when the duration is not a usable length.
pub fn target_position(offset: f64, media_duration: f64) -> Option<f64> {
    if !media_duration.is_finite() || media_duration <= 0.0 || !offset.is_finite() {
        return None;
    }
    Some(offset.rem_euclid(media_duration))
}

/// Position to seek to this tick, if any
///
/// * `timeline_duration` - finalized `options.duration`; reconciliation is
///   skipped entirely when it is unset (unknown or live sources)
/// * `offset` - authoritative offset from the host
/// * `media_duration` - duration the backend reports
/// * `current` - backend's current position
pub fn reconcile(
    timeline_duration: Option<f64>,
    offset: f64,
    media_duration: Option<f64>,
    current: f64,
) -> Option<f64> {
    timeline_duration?;
    let target = target_position(offset, media_duration?)?;

    if (target - current).abs() > MAX_DRIFT_SECS {
        Some(target)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_wraps_looping_offsets() {
        assert_eq!(target_position(250.0, 200.0), Some(50.0));
        assert_eq!(target_position(-10.0, 200.0), Some(190.0));
        assert_eq!(target_position(10.0, 0.0), None);
        assert_eq!(target_position(10.0, f64::INFINITY), None);
        assert_eq!(target_position(10.0, f64::NAN), None);
    }

    #[test]
    fn test_no_correction_within_tolerance() {
        assert_eq!(reconcile(Some(200.0), 100.0, Some(200.0), 98.0), None);
        assert_eq!(reconcile(Some(200.0), 100.0, Some(200.0), 102.0), None);
        assert_eq!(reconcile(Some(200.0), 100.0, Some(200.0), 100.5), None);
    }

    #[test]
    fn test_correction_beyond_tolerance() {
        assert_eq!(reconcile(Some(200.0), 100.0, Some(200.0), 97.9), Some(100.0));
        assert_eq!(reconcile(Some(200.0), 410.0, Some(200.0), 0.0), Some(10.0));
    }

    #[test]
    fn test_skipped_without_timeline_duration() {
        assert_eq!(reconcile(None, 100.0, Some(200.0), 0.0), None);
        assert_eq!(reconcile(Some(200.0), 100.0, None, 0.0), None);
    }
}
