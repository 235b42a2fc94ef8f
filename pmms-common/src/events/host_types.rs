//! Host-facing wire types
//!
//! Everything the host simulation sends to the engine: the per-source
//! handle, the options snapshot and the per-tick update frame.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::timecode::deserialize_offset;

/// Host-assigned identifier for one logical sound source
///
/// Hosts use either integers or strings; both are accepted and compared
/// exactly (`1` and `"1"` are different handles).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Handle {
    Id(i64),
    Name(String),
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handle::Id(id) => write!(f, "{}", id),
            Handle::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<i64> for Handle {
    fn from(id: i64) -> Self {
        Handle::Id(id)
    }
}

impl From<&str> for Handle {
    fn from(name: &str) -> Self {
        Handle::Name(name.to_string())
    }
}

/// Room-dependent attenuation factors (0.0-1.0)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attenuation {
    #[serde(default)]
    pub same_room: f64,
    #[serde(default)]
    pub diff_room: f64,
}

/// Host configuration snapshot accompanying `init` and every `update`
///
/// Replaced wholesale on each update. Keys this type does not model are
/// kept in `extra` and echoed back in notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Media URL or media-server identifier
    #[serde(default)]
    pub url: String,

    /// Display title; `null` or empty falls back to the URL at init
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    /// Authoritative timeline position (seconds)
    #[serde(default, deserialize_with = "deserialize_offset")]
    pub offset: f64,

    /// Known finite duration (seconds); `false` on the wire when unknown or live
    #[serde(
        default,
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub duration: Option<f64>,

    #[serde(default, rename = "loop", alias = "looped")]
    pub looped: bool,

    #[serde(default)]
    pub muted: bool,

    #[serde(default)]
    pub paused: bool,

    /// Maximum audible distance; absent means unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<f64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub attenuation: Attenuation,

    /// Target volume factor when listener and source are in different rooms
    #[serde(default = "default_diff_room_volume")]
    pub diff_room_volume: f64,

    #[serde(default)]
    pub filter: bool,

    /// Visualization tag resolved through the startup visualization map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization: Option<String>,

    #[serde(default)]
    pub video: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub video_size: f64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_diff_room_volume() -> f64 {
    1.0
}

impl Default for Options {
    fn default() -> Self {
        Self {
            url: String::new(),
            title: String::new(),
            offset: 0.0,
            duration: None,
            looped: false,
            muted: false,
            paused: false,
            range: None,
            attenuation: Attenuation::default(),
            diff_room_volume: default_diff_room_volume(),
            filter: false,
            visualization: None,
            video: false,
            video_size: 0.0,
            extra: Map::new(),
        }
    }
}

impl Options {
    /// Options carrying only a media URL, everything else defaulted
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Whether `distance` lies beyond the configured audible range
    pub fn out_of_range(&self, distance: f64) -> bool {
        match self.range {
            Some(range) => distance > range,
            None => false,
        }
    }
}

fn serialize_duration<S>(duration: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match duration {
        Some(secs) => serializer.serialize_f64(*secs),
        None => serializer.serialize_bool(false),
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    // Numbers are durations; false, true and null all mean "not known".
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).filter(|secs| secs.is_finite() && *secs > 0.0))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_distance() -> f64 {
    -1.0
}

fn default_volume() -> f64 {
    100.0
}

/// Per-tick positional update for one handle
///
/// Produced by the host once per synchronization interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFrame {
    pub handle: Handle,

    /// Listener distance; negative means undefined / out of range
    #[serde(default = "default_distance")]
    pub distance: f64,

    /// Host volume on a 0-100 scale
    #[serde(default = "default_volume")]
    pub volume: f64,

    #[serde(default)]
    pub same_room: bool,

    #[serde(default)]
    pub options: Options,
}

/// Inbound command from the host (one message per event, fire-and-forget)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostCommand {
    /// Create the entity for `handle` unless one already exists
    #[serde(rename = "init")]
    Init { handle: Handle, options: Options },

    /// Resolve an existing entity only
    #[serde(rename = "play")]
    Play { handle: Handle },

    /// Tear down the entity and its ancillary resources
    #[serde(rename = "stop")]
    Stop { handle: Handle },

    /// Drive attenuation, volume and clock reconciliation for one tick
    #[serde(rename = "update")]
    Update(UpdateFrame),

    /// Browser bridge liveness check, answered with `DuiBrowser:initDone`
    #[serde(rename = "DuiBrowser:init")]
    BrowserInit { handle: Handle },
}

impl HostCommand {
    /// Handle the command refers to
    pub fn handle(&self) -> &Handle {
        match self {
            HostCommand::Init { handle, .. }
            | HostCommand::Play { handle }
            | HostCommand::Stop { handle }
            | HostCommand::BrowserInit { handle } => handle,
            HostCommand::Update(frame) => &frame.handle,
        }
    }

    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            HostCommand::Init { .. } => "init",
            HostCommand::Play { .. } => "play",
            HostCommand::Stop { .. } => "stop",
            HostCommand::Update(_) => "update",
            HostCommand::BrowserInit { .. } => "DuiBrowser:init",
        }
    }
}
