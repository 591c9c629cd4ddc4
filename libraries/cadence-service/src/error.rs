//! Service errors

use thiserror::Error;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The engine thread is gone
    #[error("Playback engine is not running")]
    Disconnected,

    /// The engine did not answer a query in time
    #[error("Timed out waiting for the playback engine")]
    Timeout,

    /// A worker thread could not be spawned
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Track file could not be read
    #[error("Failed to read track {path}: {message}")]
    TrackRead { path: String, message: String },

    /// Playback error
    #[error("Playback error: {0}")]
    Playback(#[from] cadence_playback::PlaybackError),

    /// Loudness tag error
    #[error("Loudness error: {0}")]
    Loudness(#[from] cadence_loudness::LoudnessError),
}

impl From<config::ConfigError> for ServiceError {
    fn from(err: config::ConfigError) -> Self {
        ServiceError::Config(err.to_string())
    }
}
