//! Error types for header decoding.

use std::string::FromUtf8Error;

/// Result type alias for decoding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Decoding error types.
///
/// Only the strict entry points ([`decode_rfc2047`](crate::encoding::decode_rfc2047),
/// [`decode_base64`](crate::encoding::decode_base64), ...) return these. The
/// address helpers are total and never fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed encoded word or escape sequence.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),
}
