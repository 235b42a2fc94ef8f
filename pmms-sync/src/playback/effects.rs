//! One-shot audio shaping and visualization attachments
//!
//! Both are attached at most once per entity, on the transition into
//! actively playing. Which filter applies depends on the host environment
//! announced at startup.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{Environment, MediaConfig};

/// Audio-shaping effect family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Phonograph,
    Radio,
}

/// Parameters of the audio-shaping chain
///
/// Stereo input is folded to mono, attenuated, then band-limited by a
/// lowpass followed by a highpass stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterProfile {
    pub kind: FilterKind,
    pub gain: f32,
    pub lowpass_hz: f32,
    pub highpass_hz: f32,
    /// Biquad stage gain (dB)
    pub stage_gain_db: f32,
    pub mono_mix: bool,
    /// CSS-style filter applied to the video surface, if any
    pub visual_style: Option<String>,
    /// Looping ambience layer mirroring the entity's transport
    pub ambience_url: Option<String>,
}

impl FilterProfile {
    pub fn phonograph(noise_url: &str) -> Self {
        Self {
            kind: FilterKind::Phonograph,
            gain: 0.5,
            lowpass_hz: 3000.0,
            highpass_hz: 300.0,
            stage_gain_db: -1.0,
            mono_mix: true,
            visual_style: Some("sepia()".to_string()),
            ambience_url: Some(noise_url.to_string()),
        }
    }

    pub fn radio() -> Self {
        Self {
            kind: FilterKind::Radio,
            gain: 0.5,
            lowpass_hz: 5000.0,
            highpass_hz: 200.0,
            stage_gain_db: -1.0,
            mono_mix: true,
            visual_style: None,
            ambience_url: None,
        }
    }

    /// Profile matching the configured host environment
    pub fn for_config(config: &MediaConfig) -> Self {
        match config.environment {
            Environment::Frontier => Self::phonograph(&config.noise_url),
            Environment::Modern => Self::radio(),
        }
    }
}

/// Rendering configuration handed to the visualization layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualizationConfig(pub Map<String, Value>);

impl VisualizationConfig {
    /// Visualization type (e.g. `cubes`, `bars`)
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }
}

/// Resolve a visualization tag through the startup visualization map
///
/// Unknown tags fall back to an empty configuration; `type` defaults to the
/// tag itself and user-event watching is always disabled.
pub fn resolve_visualization(tag: &str, config: &MediaConfig) -> VisualizationConfig {
    let mut options = config
        .audio_visualizations
        .get(tag)
        .cloned()
        .unwrap_or_default();

    options
        .entry("type")
        .or_insert_with(|| Value::String(tag.to_string()));
    options.insert("skipUserEventsWatcher".to_string(), Value::Bool(true));

    VisualizationConfig(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_follows_environment() {
        let mut cfg = MediaConfig::default();
        cfg.environment = Environment::Frontier;
        let profile = FilterProfile::for_config(&cfg);
        assert_eq!(profile.kind, FilterKind::Phonograph);
        assert_eq!(profile.lowpass_hz, 3000.0);
        assert_eq!(profile.ambience_url.as_deref(), Some(cfg.noise_url.as_str()));

        cfg.environment = Environment::Modern;
        let profile = FilterProfile::for_config(&cfg);
        assert_eq!(profile.kind, FilterKind::Radio);
        assert_eq!(profile.highpass_hz, 200.0);
        assert!(profile.ambience_url.is_none());
    }

    #[test]
    fn test_unknown_visualization_uses_tag_as_type() {
        let cfg = MediaConfig::default();
        let vis = resolve_visualization("cubes", &cfg);
        assert_eq!(vis.kind(), Some("cubes"));
        assert_eq!(vis.0["skipUserEventsWatcher"], json!(true));
    }

    #[test]
    fn test_known_visualization_keeps_its_type() {
        let mut cfg = MediaConfig::default();
        let mut bars = Map::new();
        bars.insert("type".into(), json!("shine"));
        bars.insert("colors".into(), json!(["#fff"]));
        cfg.audio_visualizations.insert("fancy".into(), bars);

        let vis = resolve_visualization("fancy", &cfg);
        assert_eq!(vis.kind(), Some("shine"));
        assert_eq!(vis.0["colors"], json!(["#fff"]));
        // The shared map itself is left untouched
        assert!(cfg.audio_visualizations["fancy"].get("skipUserEventsWatcher").is_none());
    }
}
