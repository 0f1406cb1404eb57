//! Error types for Mockfetch

use thiserror::Error;

/// Result type for Mockfetch operations
pub type Result<T> = std::result::Result<T, MockerError>;

/// Errors raised by the library outside the fetch path
///
/// Live-call outcomes are reported through
/// [`FetchFailure`](crate::mocker::FetchFailure) instead.
#[derive(Debug, Error)]
pub enum MockerError {
    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Durable store unreadable or unwritable
    #[error("Persistence error at {path}: {reason}")]
    Persistence {
        /// Location of the durable store
        path: String,
        /// What went wrong
        reason: String,
    },
}
