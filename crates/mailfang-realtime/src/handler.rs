//! Callbacks for channel lifecycle and inbound frames.
//!
//! Every method of [`Handler`] has a no-op default, so implementors only
//! override what they care about. [`Callbacks`] adapts optional closures to
//! the trait.
//!
//! # Example
//!
//! ```
//! use mailfang_realtime::{Callbacks, Frame};
//!
//! let callbacks = Callbacks::new()
//!     .on_open(|| println!("connected"))
//!     .on_message(|frame: Frame| {
//!         if let Some(text) = frame.as_text() {
//!             println!("push: {text}");
//!         }
//!     });
//! ```

use crate::transport::{Frame, TransportError};

/// Handler for channel events.
///
/// All methods run on the channel task, one at a time, in the order the
/// transport emitted them.
pub trait Handler: Send + 'static {
    /// Called for every inbound frame, unparsed.
    fn on_message(&mut self, frame: Frame) {
        let _ = frame;
    }

    /// Called when a connection opens.
    fn on_open(&mut self) {}

    /// Called when the transport reports an error. A close follows.
    fn on_error(&mut self, error: &TransportError) {
        let _ = error;
    }

    /// Called when a connection closes, including after an error.
    fn on_close(&mut self) {}
}

impl Handler for () {}

type MessageFn = Box<dyn FnMut(Frame) + Send>;
type ErrorFn = Box<dyn FnMut(&TransportError) + Send>;
type NotifyFn = Box<dyn FnMut() + Send>;

/// Optional closures acting as a [`Handler`]. Absent callbacks are no-ops.
#[derive(Default)]
pub struct Callbacks {
    message: Option<MessageFn>,
    open: Option<NotifyFn>,
    error: Option<ErrorFn>,
    close: Option<NotifyFn>,
}

impl Callbacks {
    /// Creates an empty set of callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the message callback.
    #[must_use]
    pub fn on_message(mut self, f: impl FnMut(Frame) + Send + 'static) -> Self {
        self.message = Some(Box::new(f));
        self
    }

    /// Sets the open callback.
    #[must_use]
    pub fn on_open(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.open = Some(Box::new(f));
        self
    }

    /// Sets the error callback.
    #[must_use]
    pub fn on_error(mut self, f: impl FnMut(&TransportError) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Sets the close callback.
    #[must_use]
    pub fn on_close(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.close = Some(Box::new(f));
        self
    }
}

impl Handler for Callbacks {
    fn on_message(&mut self, frame: Frame) {
        if let Some(f) = self.message.as_mut() {
            f(frame);
        }
    }

    fn on_open(&mut self) {
        if let Some(f) = self.open.as_mut() {
            f();
        }
    }

    fn on_error(&mut self, error: &TransportError) {
        if let Some(f) = self.error.as_mut() {
            f(error);
        }
    }

    fn on_close(&mut self) {
        if let Some(f) = self.close.as_mut() {
            f();
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_message", &self.message.is_some())
            .field("on_open", &self.open.is_some())
            .field("on_error", &self.error.is_some())
            .field("on_close", &self.close.is_some())
            .finish()
    }
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
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_unit_handler_is_noop() {
        Handler::on_open(&mut ());
        Handler::on_message(&mut (), Frame::from("ignored"));
        Handler::on_error(&mut (), &TransportError::new("ignored"));
        Handler::on_close(&mut ());
    }

    #[test]
    fn test_empty_callbacks_are_noops() {
        let mut callbacks = Callbacks::new();
        Handler::on_open(&mut callbacks);
        Handler::on_message(&mut callbacks, Frame::from("ignored"));
        Handler::on_error(&mut callbacks, &TransportError::new("ignored"));
        Handler::on_close(&mut callbacks);
    }

    #[test]
    fn test_callbacks_invoked() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut callbacks = Callbacks::new()
            .on_open({
                let log = Arc::clone(&log);
                move || log.lock().unwrap().push("open".to_string())
            })
            .on_message({
                let log = Arc::clone(&log);
                move |frame: Frame| {
                    log.lock()
                        .unwrap()
                        .push(format!("message:{}", frame.as_text().unwrap_or("")));
                }
            })
            .on_error({
                let log = Arc::clone(&log);
                move |e: &TransportError| log.lock().unwrap().push(format!("error:{e}"))
            })
            .on_close({
                let log = Arc::clone(&log);
                move || log.lock().unwrap().push("close".to_string())
            });

        Handler::on_open(&mut callbacks);
        Handler::on_message(&mut callbacks, Frame::from("hi"));
        Handler::on_error(&mut callbacks, &TransportError::new("boom"));
        Handler::on_close(&mut callbacks);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["open", "message:hi", "error:boom", "close"]
        );
    }

    #[test]
    fn test_callbacks_debug() {
        let callbacks = Callbacks::new().on_open(|| {});
        let debug = format!("{callbacks:?}");
        assert!(debug.contains("on_open: true"));
        assert!(debug.contains("on_close: false"));
    }
}
