//! Error types for pmms-sync
//!
//! Backend-level failures are caught at the adapter boundary and turned into
//! host notifications; these types cover everything else (configuration,
//! transport, resolution).

use thiserror::Error;

/// Main error type for pmms-sync
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Outbound host callback failures
    #[error("Host callback error: {0}")]
    HostCallback(#[from] reqwest::Error),

    /// Media identifier could not be turned into a playable source
    #[error("Cannot resolve media source '{url}': {reason}")]
    Resolution { url: String, reason: String },

    /// Media backend reported a failure
    #[error("Media backend error: {0}")]
    Backend(String),

    /// The engine task is gone (queue closed)
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),
}

/// Convenience Result type using pmms-sync Error
pub type Result<T> = std::result::Result<T, Error>;
