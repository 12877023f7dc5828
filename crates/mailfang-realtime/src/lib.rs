//! # mailfang-realtime
//!
//! Reconnecting push channel for the mailfang viewer.
//!
//! The server announces new, read and deleted mail over a WebSocket at `/ws`.
//! [`Channel`] keeps that connection alive: it reconnects after the configured
//! interval whenever the connection drops, re-checks it when the owning view
//! becomes visible again, and hands every raw frame to a [`Handler`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailfang_realtime::{Callbacks, Channel, ChannelConfig, WebSocketConnector};
//!
//! let config = ChannelConfig::new("http://localhost:3000".parse()?);
//! let channel = Channel::open(
//!     WebSocketConnector::new(),
//!     Callbacks::new().on_message(|frame| println!("{frame:?}")),
//!     config,
//! )?;
//!
//! assert!(!channel.is_connected()); // still connecting
//! channel.close().await;
//! ```
//!
//! ## Transports
//!
//! The channel only talks to the [`Connector`] and [`Transport`] traits.
//! [`WebSocketConnector`] is the production implementation; tests can plug in
//! their own and drive lifecycle events by hand.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod channel;
pub mod config;
mod error;
pub mod handler;
pub mod transport;
pub mod websocket;

pub use channel::{Channel, ConnectionState, Visibility};
pub use config::{ChannelConfig, ChannelConfigBuilder, DEFAULT_RECONNECT_INTERVAL};
pub use error::{Error, Result};
pub use handler::{Callbacks, Handler};
pub use transport::{Connector, Frame, Transport, TransportError, TransportEvent, TransportEvents};
pub use websocket::WebSocketConnector;
