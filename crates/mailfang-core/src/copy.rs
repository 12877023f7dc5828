//! Copy-to-clipboard with transient "copied" feedback.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::{Error, Result};

/// How long the copied flag stays set.
pub const COPIED_RESET: Duration = Duration::from_secs(2);

/// Something text can be copied to.
pub trait Clipboard: Send + Sync {
    /// Replaces the clipboard contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the text could not be copied.
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Clipboard backed by the first available system tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandClipboard;

impl CommandClipboard {
    /// Tools tried in order, with their arguments.
    const CANDIDATES: &'static [(&'static str, &'static [&'static str])] = &[
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
        ("xsel", &["--clipboard", "--input"]),
        ("pbcopy", &[]),
        ("clip", &[]),
    ];
}

impl Clipboard for CommandClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        for (program, args) in Self::CANDIDATES {
            let Ok(mut child) = Command::new(program)
                .args(*args)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
            else {
                continue;
            };

            if let Some(mut stdin) = child.stdin.take()
                && stdin.write_all(text.as_bytes()).is_err()
            {
                let _ = child.wait();
                continue;
            }

            if child.wait().is_ok_and(|status| status.success()) {
                debug!(program, "copied to clipboard");
                return Ok(());
            }
        }

        Err(Error::Clipboard(
            "none of wl-copy, xclip, xsel, pbcopy or clip succeeded".to_string(),
        ))
    }
}

/// Copies text and exposes a flag that is set for [`COPIED_RESET`] after each
/// successful copy.
///
/// Copying again while the flag is set restarts the window.
#[derive(Debug)]
pub struct CopyFeedback<C> {
    clipboard: C,
    copied: watch::Sender<bool>,
    reset: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Clipboard> CopyFeedback<C> {
    /// Creates feedback state around a clipboard.
    pub fn new(clipboard: C) -> Self {
        Self {
            clipboard,
            copied: watch::Sender::new(false),
            reset: Mutex::new(None),
        }
    }

    /// Copies `text` and sets the copied flag.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard rejects the text; the flag is left
    /// unchanged.
    pub fn handle_copy(&self, text: &str) -> Result<()> {
        self.clipboard.write_text(text)?;
        self.copied.send_replace(true);

        let deadline = Instant::now() + COPIED_RESET;
        let copied = self.copied.clone();
        let task = tokio::spawn(async move {
            sleep_until(deadline).await;
            copied.send_replace(false);
        });

        let mut reset = self
            .reset
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(previous) = reset.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    /// Returns true within [`COPIED_RESET`] of the last copy.
    #[must_use]
    pub fn is_copied(&self) -> bool {
        *self.copied.borrow()
    }

    /// Returns a receiver that observes the copied flag.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.copied.subscribe()
    }
}

impl<C> Drop for CopyFeedback<C> {
    fn drop(&mut self) {
        let reset = self
            .reset
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(task) = reset.take() {
            task.abort();
        }
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
    use std::sync::Arc;
    use tokio::time::advance;

    #[derive(Default, Clone)]
    struct MockClipboard {
        contents: Arc<Mutex<Vec<String>>>,
        broken: bool,
    }

    impl Clipboard for MockClipboard {
        fn write_text(&self, text: &str) -> Result<()> {
            if self.broken {
                return Err(Error::Clipboard("no clipboard".to_string()));
            }
            self.contents.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_resets_after_two_seconds() {
        let clipboard = MockClipboard::default();
        let feedback = CopyFeedback::new(clipboard.clone());

        feedback.handle_copy("john@example.com").unwrap();
        assert!(feedback.is_copied());
        assert_eq!(*clipboard.contents.lock().unwrap(), ["john@example.com"]);

        advance(Duration::from_millis(1999)).await;
        settle().await;
        assert!(feedback.is_copied());

        advance(Duration::from_millis(1)).await;
        settle().await;
        assert!(!feedback.is_copied());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_copy_restarts_window() {
        let feedback = CopyFeedback::new(MockClipboard::default());

        feedback.handle_copy("first").unwrap();
        advance(Duration::from_millis(1500)).await;
        feedback.handle_copy("second").unwrap();

        advance(Duration::from_millis(1000)).await;
        settle().await;
        assert!(feedback.is_copied());

        advance(Duration::from_millis(1000)).await;
        settle().await;
        assert!(!feedback.is_copied());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_copy_leaves_flag_unset() {
        let clipboard = MockClipboard {
            broken: true,
            ..MockClipboard::default()
        };
        let feedback = CopyFeedback::new(clipboard);

        assert!(matches!(
            feedback.handle_copy("x"),
            Err(Error::Clipboard(_))
        ));
        assert!(!feedback.is_copied());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_observes_changes() {
        let feedback = CopyFeedback::new(MockClipboard::default());
        let mut rx = feedback.subscribe();

        feedback.handle_copy("x").unwrap();
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());

        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
    }
}
