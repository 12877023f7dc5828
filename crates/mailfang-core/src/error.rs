//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// API request failed.
    #[error("API error: {0}")]
    Api(#[from] mailfang_api::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Preferences file does not hold a JSON object.
    #[error("Corrupt preferences file: {0}")]
    CorruptPreferences(String),

    /// No clipboard tool accepted the text.
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
