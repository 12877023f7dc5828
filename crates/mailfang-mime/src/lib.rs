//! # mailfang-mime
//!
//! Header value decoding for the mailfang email viewer.
//!
//! ## Features
//!
//! - **Address lists**: Split `To`/`Cc`/`From` values into individual
//!   mailboxes without breaking on commas inside quotes or angle brackets
//! - **Encoded words**: RFC 2047 `=?charset?B|Q?...?=` decoding for display
//!   names and subjects
//! - **Header collections**: Case-insensitive multi-valued header maps
//!
//! ## Quick Start
//!
//! ```
//! use mailfang_mime::{parse_and_decode_addresses, parse_and_decode_header_values};
//!
//! let to = parse_and_decode_addresses(
//!     r#"=?UTF-8?B?Sm9obiBEb2U=?= <john@example.com>, "Doe, Jane" <jane@example.com>"#,
//! );
//! assert_eq!(to, ["John Doe <john@example.com>", r#""Doe, Jane" <jane@example.com>"#]);
//!
//! let all = parse_and_decode_header_values(["a@x.com, b@y.com", "c@z.com"]);
//! assert_eq!(all, ["a@x.com", "b@y.com", "c@z.com"]);
//! ```
//!
//! None of the address helpers can fail. Malformed quoting or bracketing only
//! changes where the list is split, and undecodable encoded words are kept
//! verbatim.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod error;
mod header;

pub mod encoding;

pub use address::{
    decode_address, parse_addresses, parse_and_decode_addresses, parse_and_decode_header_values,
};
pub use encoding::decode_mime_words;
pub use error::{Error, Result};
pub use header::Headers;
