//! Error types for playback management

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Index out of bounds
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// A track could not be loaded by the player backend
    #[error("Failed to load track {track_id}: {message}")]
    LoadFailed { track_id: String, message: String },

    /// Persisted session is inconsistent
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// Session (de)serialization error
    #[error("Session format error: {0}")]
    SessionFormat(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
