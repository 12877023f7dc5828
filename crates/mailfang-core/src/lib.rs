//! # mailfang-core
//!
//! Client-side state for the mailfang email viewer.
//!
//! This crate provides:
//! - **UI stores** - pane layout and search state, persisted as JSON
//! - **Routing** - the viewer's path table, redirects and the first-email guard
//! - **Copy feedback** - clipboard writes with a transient "copied" flag

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod copy;
mod error;
pub mod router;
pub mod store;

pub use copy::{COPIED_RESET, Clipboard, CommandClipboard, CopyFeedback};
pub use error::{Error, Result};
pub use router::{FirstEmailLookup, Location, Route, Router};
pub use store::{
    FileStore, KeyValueStore, MailLayout, MemoryStore, Persisted, ScreenSize, SearchState, Store,
};
