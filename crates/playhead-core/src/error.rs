//! Error types for Playhead Core

use crate::types::QualityLevel;
use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Controller error types
#[derive(Error, Debug)]
pub enum Error {
    // Platform policy errors
    #[error("Play request rejected: {0}")]
    PlayRejected(String),

    #[error("Fullscreen request rejected: {0}")]
    FullscreenRejected(String),

    // Lifecycle errors
    #[error("Controller is not attached to a media resource")]
    NotAttached,

    // Quality errors
    #[error("Unknown quality level: {0}")]
    UnknownQuality(String),

    #[error("Quality {0} is not available for this source")]
    QualityUnavailable(QualityLevel),

    // Source errors
    #[error("Invalid source path: {0}")]
    InvalidSource(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if playback can continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::PlayRejected(_)
                | Error::FullscreenRejected(_)
                | Error::NotAttached
                | Error::QualityUnavailable(_)
        )
    }

    /// Returns a short, stable code for diagnostics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::PlayRejected(_) => "PLAY_REJECTED",
            Error::FullscreenRejected(_) => "FULLSCREEN_REJECTED",
            Error::NotAttached => "NOT_ATTACHED",
            Error::UnknownQuality(_) => "UNKNOWN_QUALITY",
            Error::QualityUnavailable(_) => "QUALITY_UNAVAILABLE",
            Error::InvalidSource(_) => "INVALID_SOURCE",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Io(_) => "IO",
        }
    }
}
