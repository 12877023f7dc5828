//! # mailfang-api
//!
//! Client for the mailfang HTTP API.
//!
//! ## Features
//!
//! - **Listing**: inbox, unread, with-attachments and per-recipient views,
//!   paginated and searchable
//! - **Messages**: fetch, delete, raw source, sanitized HTML rendering
//! - **Counters**: sidebar and global counts
//! - **Push events**: typed decoding of the frames the server sends over the
//!   real-time channel
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailfang_api::ApiClient;
//!
//! let api = ApiClient::new("http://localhost:3000".parse()?);
//! if let Some(page) = api.inbox(1, Some("invoice")).await? {
//!     for email in &page.emails {
//!         println!("{} {}", email.id, email.decoded_subject().unwrap_or_default());
//!     }
//! }
//! ```
//!
//! Any non-2xx response becomes [`Error::Status`] carrying the reason phrase.
//! A 204 or empty reply from a JSON endpoint is `Ok(None)`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod event;
pub mod model;

pub use client::ApiClient;
pub use error::{Error, Result};
pub use event::ServerEvent;
pub use model::{
    Attachment, EmailCounts, EmailListRecord, EmailListResponse, EmailRecord, PaginationInfo,
    RecipientCount,
};
