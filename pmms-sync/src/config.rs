//! Configuration management for pmms-sync
//!
//! Two layers:
//! 1. **TOML Bootstrap** ([`TomlConfig`]): port, logging, media server,
//!    host callback and simulation settings. Read once at startup.
//! 2. **Process configuration** ([`MediaConfig`]): built from the bootstrap
//!    layer plus command-line overrides, then amended by the host's startup
//!    handshake. Immutable afterwards and shared with the engine by `Arc`.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--port`, `--server-endpoint`, ...)
//! 2. Environment variables (`PMMS_*`, via clap)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use pmms_common::config::LoggingConfig;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

/// Rendering configuration per visualization tag
pub type VisualizationMap = HashMap<String, Map<String, Value>>;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP port of the host bridge
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub media: MediaSection,

    #[serde(default)]
    pub host: HostSection,

    #[serde(default)]
    pub simulation: SimulationSection,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            logging: LoggingConfig::default(),
            media: MediaSection::default(),
            host: HostSection::default(),
            simulation: SimulationSection::default(),
        }
    }
}

fn default_port() -> u16 {
    30125
}

/// Which audio-shaping tuning the host environment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Period setting: phonograph filter with a noise ambience layer
    Frontier,
    /// Contemporary setting: radio band-pass filter
    Modern,
}

impl Environment {
    pub fn from_rdr_flag(is_rdr: bool) -> Self {
        if is_rdr {
            Environment::Frontier
        } else {
            Environment::Modern
        }
    }
}

/// `[media]` section
#[derive(Debug, Clone, Deserialize)]
pub struct MediaSection {
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// `host:port` of the media server that serves non-absolute identifiers
    #[serde(default = "default_server_endpoint")]
    pub server_endpoint: String,

    /// Path segment preceding `/media/` on the media server
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_environment")]
    pub environment: Environment,

    /// Source of the phonograph noise ambience layer
    #[serde(default = "default_noise_url")]
    pub noise_url: String,

    #[serde(default)]
    pub visualizations: VisualizationMap,
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            server_endpoint: default_server_endpoint(),
            namespace: default_namespace(),
            environment: default_environment(),
            noise_url: default_noise_url(),
            visualizations: VisualizationMap::new(),
        }
    }
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_server_endpoint() -> String {
    "127.0.0.1:30120".to_string()
}

fn default_namespace() -> String {
    "pmms".to_string()
}

fn default_environment() -> Environment {
    Environment::Frontier
}

fn default_noise_url() -> String {
    "https://redm.khzae.net/phonograph/noise.webm".to_string()
}

/// `[host]` section
#[derive(Debug, Clone, Deserialize)]
pub struct HostSection {
    /// Base URL notifications are POSTed to (`<callback_url>/<name>`)
    #[serde(default)]
    pub callback_url: Option<String>,

    /// Request `duiStartup` from the host before the engine starts
    #[serde(default = "default_startup_handshake")]
    pub startup_handshake: bool,

    #[serde(default = "default_callback_timeout_ms")]
    pub callback_timeout_ms: u64,
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            callback_url: None,
            startup_handshake: default_startup_handshake(),
            callback_timeout_ms: default_callback_timeout_ms(),
        }
    }
}

fn default_startup_handshake() -> bool {
    true
}

fn default_callback_timeout_ms() -> u64 {
    2000
}

impl HostSection {
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_millis(self.callback_timeout_ms)
    }
}

/// `[simulation]` section, tuning the headless backend used by the binary
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSection {
    #[serde(default = "default_ready_delay_ms")]
    pub ready_delay_ms: u64,

    /// Duration reported for finite sources
    #[serde(default = "default_duration_secs")]
    pub default_duration_secs: f64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            ready_delay_ms: default_ready_delay_ms(),
            default_duration_secs: default_duration_secs(),
        }
    }
}

fn default_ready_delay_ms() -> u64 {
    250
}

fn default_duration_secs() -> f64 {
    180.0
}

/// Startup handshake response from the host
///
/// Every field is optional; absent fields keep the configured value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupHandshake {
    #[serde(default, rename = "isRDR")]
    pub is_rdr: Option<bool>,

    #[serde(default)]
    pub audio_visualizations: Option<VisualizationMap>,

    #[serde(default)]
    pub current_server_endpoint: Option<String>,
}

/// Process-scoped media configuration injected into the engine
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub scheme: String,
    pub server_endpoint: String,
    pub namespace: String,
    pub environment: Environment,
    pub noise_url: String,
    pub audio_visualizations: VisualizationMap,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self::from_section(&MediaSection::default())
    }
}

impl MediaConfig {
    pub fn from_section(section: &MediaSection) -> Self {
        Self {
            scheme: section.scheme.clone(),
            server_endpoint: section.server_endpoint.clone(),
            namespace: section.namespace.clone(),
            environment: section.environment,
            noise_url: section.noise_url.clone(),
            audio_visualizations: section.visualizations.clone(),
        }
    }

    /// Apply the host's startup handshake
    pub fn apply_handshake(&mut self, handshake: StartupHandshake) {
        if let Some(is_rdr) = handshake.is_rdr {
            self.environment = Environment::from_rdr_flag(is_rdr);
        }
        if let Some(visualizations) = handshake.audio_visualizations {
            self.audio_visualizations = visualizations;
        }
        if let Some(endpoint) = handshake.current_server_endpoint {
            self.server_endpoint = endpoint;
        }
        info!(
            "Media configuration: endpoint={} environment={:?} visualizations={}",
            self.server_endpoint,
            self.environment,
            self.audio_visualizations.len()
        );
    }

    /// Media-server URL for a non-absolute identifier
    pub fn media_url(&self, identifier: &str) -> String {
        format!(
            "{}://{}/{}/media/{}",
            self.scheme, self.server_endpoint, self.namespace, identifier
        )
    }
}
