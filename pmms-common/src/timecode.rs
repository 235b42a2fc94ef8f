//! Timecode parsing for playback offsets
//!
//! Hosts send the authoritative offset either as a number of seconds or as a
//! timecode string. Accepted string forms:
//! - `"H:MM:SS"` (hours, minutes, seconds)
//! - `"M:SS"` (minutes, seconds)
//! - `"SSS"` or `"SSS.s"` (seconds)

use crate::{Error, Result};
use serde::{Deserialize, Deserializer};

/// Parse a timecode string into seconds.
///
/// # Examples
///
/// ```
/// use pmms_common::timecode::parse_timecode;
///
/// assert_eq!(parse_timecode("1:02:03").unwrap(), 3723.0);
/// assert_eq!(parse_timecode("2:30").unwrap(), 150.0);
/// assert_eq!(parse_timecode("42").unwrap(), 42.0);
/// assert!(parse_timecode("abc").is_err());
/// ```
pub fn parse_timecode(timecode: &str) -> Result<f64> {
    let invalid = || Error::InvalidTimecode(timecode.to_string());

    let trimmed = timecode.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    // A lone field may carry fractional seconds ("30.5")
    if !trimmed.contains(':') {
        return trimmed
            .parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .ok_or_else(invalid);
    }

    let fields = trimmed
        .split(':')
        .map(|part| part.trim().parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<u64>>>()?;

    let seconds = match fields.as_slice() {
        [m, s] => m.checked_mul(60).and_then(|m| m.checked_add(*s)),
        [h, m, s] => h
            .checked_mul(3600)
            .and_then(|h| m.checked_mul(60).and_then(|m| h.checked_add(m)))
            .and_then(|hm| hm.checked_add(*s)),
        _ => None,
    };

    seconds.map(|secs| secs as f64).ok_or_else(invalid)
}

/// Offset as it appears on the wire: seconds or a timecode string
#[derive(Deserialize)]
#[serde(untagged)]
enum RawOffset {
    Seconds(f64),
    Timecode(String),
}

/// Serde helper deserializing an offset given as number or timecode string.
///
/// `null` and a missing field both yield `0.0`.
pub fn deserialize_offset<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawOffset>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(RawOffset::Seconds(secs)) => Ok(secs),
        Some(RawOffset::Timecode(tc)) => parse_timecode(&tc).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct OffsetField {
        #[serde(default, deserialize_with = "deserialize_offset")]
        offset: f64,
    }

    #[test]
    fn test_parse_hours_minutes_seconds() {
        assert_eq!(parse_timecode("0:00:00").unwrap(), 0.0);
        assert_eq!(parse_timecode("01:00:01").unwrap(), 3601.0);
    }

    #[test]
    fn test_parse_rejects_extra_fields() {
        assert!(parse_timecode("1:2:3:4").is_err());
        assert!(parse_timecode("").is_err());
        assert!(parse_timecode("1:xx").is_err());
    }

    #[test]
    fn test_parse_decimal_seconds() {
        assert_eq!(parse_timecode("30.5").unwrap(), 30.5);
        assert_eq!(parse_timecode(" 90 ").unwrap(), 90.0);
        assert!(parse_timecode("-5").is_err());
        assert!(parse_timecode("NaN").is_err());
        assert!(parse_timecode("1:30.5").is_err());
    }

    #[test]
    fn test_parse_overflowing_fields_is_error() {
        assert!(matches!(
            parse_timecode("5124095576030432:00:00"),
            Err(Error::InvalidTimecode(_))
        ));
        assert!(parse_timecode("0:18446744073709551615:00").is_err());
        assert!(parse_timecode("307445734561825861:59").is_err());
    }

    #[test]
    fn test_offset_from_number_or_string() {
        let p: OffsetField = serde_json::from_str(r#"{"offset": 12.5}"#).unwrap();
        assert_eq!(p.offset, 12.5);

        let p: OffsetField = serde_json::from_str(r#"{"offset": "0:01:10"}"#).unwrap();
        assert_eq!(p.offset, 70.0);

        let p: OffsetField = serde_json::from_str(r#"{"offset": "30.5"}"#).unwrap();
        assert_eq!(p.offset, 30.5);

        let p: OffsetField = serde_json::from_str(r#"{"offset": null}"#).unwrap();
        assert_eq!(p.offset, 0.0);

        let p: OffsetField = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(p.offset, 0.0);
    }

    #[test]
    fn test_offset_invalid_timecode_is_error() {
        assert!(serde_json::from_str::<OffsetField>(r#"{"offset": "soon"}"#).is_err());
    }
}
