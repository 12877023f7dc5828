//! Transport abstraction underneath the channel.
//!
//! A [`Connector`] opens one [`Transport`] per connection attempt. The
//! transport reports its lifecycle through the [`TransportEvents`] sink it was
//! opened with: `opened`, then any number of `message`/`error`, then exactly
//! one `closed`. A transport that fails before opening reports `error` and
//! `closed` without `opened`.

use tokio::sync::mpsc;
use url::Url;

/// A message frame, text or binary. The channel never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

impl Frame {
    /// Returns the text payload, if this is a text frame.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Self::Binary(data)
    }
}

/// A transport-level failure, reported to the handler and never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(String);

impl TransportError {
    /// Creates a transport error from a description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Returns the error description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self(err.to_string())
    }
}

/// Lifecycle event emitted by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established.
    Opened,
    /// A frame arrived.
    Message(Frame),
    /// Something went wrong; a `Closed` event follows.
    Error(TransportError),
    /// The connection is gone.
    Closed,
}

/// Sink a transport reports its lifecycle through.
///
/// Each sink is bound to one connection attempt. Events from a transport the
/// channel has since replaced are discarded, so a stale sink is harmless.
#[derive(Debug, Clone)]
pub struct TransportEvents {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
}

impl TransportEvents {
    pub(crate) const fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, TransportEvent)>) -> Self {
        Self { generation, tx }
    }

    /// Returns the connection attempt this sink belongs to.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Emits an event. Dropped silently once the channel is gone.
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.tx.send((self.generation, event));
    }

    /// Reports that the connection is open.
    pub fn opened(&self) {
        self.emit(TransportEvent::Opened);
    }

    /// Reports an inbound frame.
    pub fn message(&self, frame: Frame) {
        self.emit(TransportEvent::Message(frame));
    }

    /// Reports a transport error.
    pub fn error(&self, error: impl Into<TransportError>) {
        self.emit(TransportEvent::Error(error.into()));
    }

    /// Reports that the connection has closed.
    pub fn closed(&self) {
        self.emit(TransportEvent::Closed);
    }
}

/// An open (or opening) connection owned by the channel.
pub trait Transport: Send {
    /// Queues a frame for sending.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection can no longer accept frames.
    fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Starts closing the connection. Must be safe to call more than once.
    fn close(&mut self);
}

/// Opens transports for the channel.
pub trait Connector: Send + 'static {
    /// Starts opening a connection to `url`.
    ///
    /// Must not block: the outcome is reported later through `events`.
    fn open(&mut self, url: &Url, events: TransportEvents) -> Box<dyn Transport>;
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_conversions() {
        assert_eq!(Frame::from("hi"), Frame::Text("hi".to_string()));
        assert_eq!(Frame::from(vec![1, 2]), Frame::Binary(vec![1, 2]));
        assert_eq!(Frame::from("hi").as_text(), Some("hi"));
        assert_eq!(Frame::from(vec![1]).as_text(), None);
    }

    #[test]
    fn test_events_are_tagged_with_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = TransportEvents::new(7, tx);

        events.opened();
        events.message(Frame::from("x"));
        events.error(TransportError::new("boom"));
        events.closed();

        assert_eq!(rx.try_recv().unwrap(), (7, TransportEvent::Opened));
        assert_eq!(
            rx.try_recv().unwrap(),
            (7, TransportEvent::Message(Frame::from("x")))
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            (7, TransportEvent::Error(TransportError::new("boom")))
        );
        assert_eq!(rx.try_recv().unwrap(), (7, TransportEvent::Closed));
    }

    #[test]
    fn test_emit_after_channel_gone_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        TransportEvents::new(1, tx).closed();
    }
}
