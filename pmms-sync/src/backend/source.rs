//! Media source resolution
//!
//! Absolute (scheme-qualified) URLs pass through unchanged; any other
//! identifier is served by the configured media server at
//! `scheme://endpoint/<namespace>/media/<identifier>`.

use serde::Serialize;
use tracing::debug;

use super::BackendKind;
use crate::config::MediaConfig;
use crate::error::{Error, Result};

const YOUTUBE_ID_LEN: usize = 11;
const YOUTUBE_PREFIXES: [&str; 3] = ["youtube.com/watch?v=", "youtu.be/", "youtube.com/embed/"];

/// A media identifier resolved into something a backend can load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaSource {
    /// Identifier exactly as the host supplied it
    pub original: String,
    pub resolved: String,
    pub kind: BackendKind,
}

/// Whether `url` carries a `scheme://` prefix
pub fn is_absolute_url(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        }
        None => false,
    }
}

/// Resolve a host media identifier against the media server configuration
pub fn resolve_media_source(url: &str, config: &MediaConfig) -> Result<MediaSource> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::Resolution {
            url: url.to_string(),
            reason: "empty media identifier".to_string(),
        });
    }

    let resolved = if is_absolute_url(trimmed) {
        trimmed.to_string()
    } else if trimmed.contains("://") {
        return Err(Error::Resolution {
            url: url.to_string(),
            reason: "malformed URL scheme".to_string(),
        });
    } else {
        config.media_url(trimmed.trim_start_matches('/'))
    };

    if let Some(video_id) = extract_youtube_video_id(&resolved) {
        debug!(video_id, "Resolved embedded platform video");
    }
    debug!(original = url, resolved = %resolved, "Resolved media source");

    Ok(MediaSource {
        original: url.to_string(),
        kind: detect_kind(&resolved),
        resolved,
    })
}

/// Pick the backend family able to play `resolved`
pub fn detect_kind(resolved: &str) -> BackendKind {
    let lower = resolved.to_ascii_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or("");

    if lower.contains("youtube.com/") || lower.contains("youtu.be/") || lower.contains("twitch.tv/")
    {
        BackendKind::EmbeddedPlatform
    } else if path.ends_with(".m3u8") {
        BackendKind::AdaptiveStream
    } else {
        BackendKind::Html5
    }
}

/// Extract the 11-character video id from a YouTube watch, short or embed URL
pub fn extract_youtube_video_id(url: &str) -> Option<&str> {
    YOUTUBE_PREFIXES.iter().find_map(|prefix| {
        let start = url.find(prefix)? + prefix.len();
        let candidate = url.get(start..start + YOUTUBE_ID_LEN)?;
        candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            .then_some(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_urls_pass_through() {
        let cfg = MediaConfig::default();
        let src = resolve_media_source("https://example.com/a.ogg", &cfg).unwrap();
        assert_eq!(src.resolved, "https://example.com/a.ogg");
        assert_eq!(src.kind, BackendKind::Html5);
    }

    #[test]
    fn test_identifiers_resolve_against_media_server() {
        let cfg = MediaConfig::default();
        let src = resolve_media_source("a.ogg", &cfg).unwrap();
        assert_eq!(src.original, "a.ogg");
        assert_eq!(src.resolved, "http://127.0.0.1:30120/pmms/media/a.ogg");
    }

    #[test]
    fn test_empty_and_malformed_identifiers_fail() {
        let cfg = MediaConfig::default();
        assert!(resolve_media_source("   ", &cfg).is_err());
        assert!(resolve_media_source("ht tp://x", &cfg).is_err());
    }

    #[test]
    fn test_kind_detection() {
        assert_eq!(
            detect_kind("https://cdn.example.com/live/stream.m3u8?token=1"),
            BackendKind::AdaptiveStream
        );
        assert_eq!(
            detect_kind("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            BackendKind::EmbeddedPlatform
        );
        assert_eq!(detect_kind("https://www.twitch.tv/somechannel"), BackendKind::EmbeddedPlatform);
        assert_eq!(detect_kind("http://host/pmms/media/a.ogg"), BackendKind::Html5);
    }

    #[test]
    fn test_youtube_video_id_extraction() {
        assert_eq!(
            extract_youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(extract_youtube_video_id("https://youtu.be/dQw4w9WgXcQ"), Some("dQw4w9WgXcQ"));
        assert_eq!(
            extract_youtube_video_id("https://youtube.com/embed/abcdefghij_"),
            Some("abcdefghij_")
        );
        assert_eq!(extract_youtube_video_id("https://youtu.be/short"), None);
        assert_eq!(extract_youtube_video_id("a.ogg"), None);
    }
}
