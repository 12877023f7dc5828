//! Error types for API operations.

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// API error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("API request failed: {reason}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status.
        reason: String,
    },

    /// A push frame did not describe a known event.
    #[error("Malformed push event: {0}")]
    MalformedEvent(String),

    /// The base URL cannot carry a path (for example `mailto:`).
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl Error {
    /// Creates a status error from an HTTP status code.
    #[must_use]
    pub fn status(status: reqwest::StatusCode) -> Self {
        Self::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    /// Returns true if the server reported that the resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
