//! Error types for ReplayGain tag handling

use thiserror::Error;

/// Result type for loudness operations
pub type Result<T> = std::result::Result<T, LoudnessError>;

/// Errors that can occur while reading ReplayGain metadata
#[derive(Error, Debug)]
pub enum LoudnessError {
    /// Tag reading error
    #[error("Failed to read audio tags: {0}")]
    TagReadError(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<lofty::error::LoftyError> for LoudnessError {
    fn from(err: lofty::error::LoftyError) -> Self {
        Self::TagReadError(err.to_string())
    }
}
