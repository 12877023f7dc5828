//! Error types for the notification channel.

use thiserror::Error;

/// Errors that can occur while setting up a channel.
///
/// Runtime transport failures are not errors of this type: they are reported
/// to [`Handler::on_error`](crate::Handler::on_error) and recovered from by
/// reconnecting.
#[derive(Debug, Error)]
pub enum Error {
    /// Neither an endpoint URL nor a server origin was configured.
    #[error("No endpoint configured: set either a URL or a server origin")]
    MissingEndpoint,

    /// The server origin uses a scheme with no real-time counterpart.
    #[error("Unsupported origin scheme: {0} (expected http or https)")]
    UnsupportedScheme(String),

    /// The server origin has no host.
    #[error("Origin has no host: {0}")]
    MissingHost(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
