//! Reconnecting notification channel.
//!
//! A [`Channel`] keeps one live connection to the server's push endpoint and
//! hands every inbound frame to a [`Handler`]. When the connection closes it
//! schedules a single reconnect after the configured interval, and keeps doing
//! so until [`Channel::disconnect`] is called.
//!
//! ## Design
//!
//! All state lives in a task spawned by [`Channel::open`]. The handle only
//! queues commands, so handlers run on that task one at a time and never race
//! with each other. The reconnect deadline is a single `Option<Instant>`, which
//! makes a second pending timer unrepresentable.
//!
//! ```text
//! Disconnected ── connect() ──→ Connecting ── opened ──→ Connected
//!       ↑                           │                        │
//!       └──────── closed ───────────┴──────── closed ────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use mailfang_realtime::{Callbacks, Channel, ChannelConfig, WebSocketConnector};
//!
//! let config = ChannelConfig::new("http://localhost:3000".parse()?);
//! let callbacks = Callbacks::new().on_message(|frame| println!("{frame:?}"));
//! let channel = Channel::open(WebSocketConnector::new(), callbacks, config)?;
//!
//! // ...
//! channel.close().await;
//! ```

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::ChannelConfig;
use crate::handler::Handler;
use crate::transport::{Connector, Frame, Transport, TransportEvent, TransportEvents};
use crate::Result;

/// Connection state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport, or the last one closed.
    #[default]
    Disconnected,
    /// A transport is opening.
    Connecting,
    /// The transport is open.
    Connected,
}

/// Visibility of the view that owns the channel.
///
/// Feed changes through [`ChannelConfig::visibility`]. A suspended or
/// backgrounded view can miss close events, so becoming visible re-checks the
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Shown to the user.
    #[default]
    Visible,
    /// Backgrounded, minimized, or suspended.
    Hidden,
}

#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Send(Frame),
    Teardown,
}

/// Handle to a running notification channel.
///
/// Dropping the handle tears the channel down: the visibility observer is
/// released, the transport is closed and no reconnect is attempted.
#[derive(Debug)]
pub struct Channel {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl Channel {
    /// Starts a channel on the current tokio runtime.
    ///
    /// With `auto_connect` set, the first connection attempt is started
    /// before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if no endpoint can be derived from `config`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn open<C, H>(connector: C, handler: H, config: ChannelConfig) -> Result<Self>
    where
        C: Connector,
        H: Handler,
    {
        let endpoint = config.endpoint()?;
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let mut actor = Actor {
            connector,
            handler,
            endpoint,
            reconnect_interval: config.reconnect_interval,
            events_tx,
            state: state_tx,
            transport: None,
            generation: 0,
            reconnect_at: None,
        };

        if config.auto_connect {
            actor.connect();
        }

        let task = tokio::spawn(actor.run(commands_rx, events_rx, config.visibility));

        Ok(Self {
            commands: commands_tx,
            state: state_rx,
            task: Some(task),
        })
    }

    /// Connects, unless already connected.
    ///
    /// Any in-flight attempt is replaced and a pending reconnect is cancelled.
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    /// Cancels any pending reconnect and closes the transport.
    ///
    /// Safe to call repeatedly. No automatic reconnect happens afterwards
    /// until [`connect`](Self::connect) is called.
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Sends a frame if connected; otherwise the frame is dropped and a
    /// warning is logged.
    pub fn send(&self, frame: impl Into<Frame>) {
        self.command(Command::Send(frame.into()));
    }

    /// Returns true if the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Returns a receiver that observes state transitions.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Tears the channel down and waits for its task to finish.
    pub async fn close(mut self) {
        let _ = self.commands.send(Command::Teardown);
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(%e, "channel task ended abnormally");
        }
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("channel task is gone; command ignored");
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Teardown);
    }
}

/// One input to the channel task.
enum Input {
    Command(Option<Command>),
    Event(u64, TransportEvent),
    ReconnectDue,
    Visibility(Option<Visibility>),
}

/// State owned by the channel task.
struct Actor<C, H> {
    connector: C,
    handler: H,
    endpoint: Url,
    reconnect_interval: Duration,
    events_tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
    state: watch::Sender<ConnectionState>,
    /// The only transport; replaced, never aliased.
    transport: Option<Box<dyn Transport>>,
    /// Bumped on every connection attempt. Events tagged with an older
    /// generation come from a released transport.
    generation: u64,
    reconnect_at: Option<Instant>,
}

impl<C, H> Actor<C, H>
where
    C: Connector,
    H: Handler,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<(u64, TransportEvent)>,
        mut visibility: Option<watch::Receiver<Visibility>>,
    ) {
        loop {
            let input = tokio::select! {
                command = commands.recv() => Input::Command(command),
                Some((generation, event)) = events.recv() => Input::Event(generation, event),
                () = wait_until(self.reconnect_at) => Input::ReconnectDue,
                visible = visibility_changed(&mut visibility) => Input::Visibility(visible),
            };

            match input {
                Input::Command(None | Some(Command::Teardown)) => break,
                Input::Command(Some(Command::Connect)) => self.connect(),
                Input::Command(Some(Command::Disconnect)) => self.disconnect(),
                Input::Command(Some(Command::Send(frame))) => self.send(frame),
                Input::Event(generation, event) => self.handle_event(generation, event),
                Input::ReconnectDue => {
                    self.reconnect_at = None;
                    info!("reconnecting");
                    self.connect();
                }
                Input::Visibility(Some(Visibility::Visible)) => self.check_and_reconnect(),
                Input::Visibility(Some(Visibility::Hidden)) => {}
                Input::Visibility(None) => {
                    debug!("visibility observer dropped");
                    visibility = None;
                }
            }
        }

        drop(visibility);
        self.disconnect();
        debug!("channel task finished");
    }

    fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    fn connect(&mut self) {
        if self.current_state() == ConnectionState::Connected {
            debug!("already connected");
            return;
        }

        self.cancel_reconnect();
        if let Some(mut previous) = self.transport.take() {
            debug!(generation = self.generation, "releasing unopened transport");
            previous.close();
        }

        self.generation += 1;
        info!(url = %self.endpoint, attempt = self.generation, "connecting");
        let events = TransportEvents::new(self.generation, self.events_tx.clone());
        self.transport = Some(self.connector.open(&self.endpoint, events));
        self.set_state(ConnectionState::Connecting);
    }

    fn disconnect(&mut self) {
        self.cancel_reconnect();

        if let Some(mut transport) = self.transport.take() {
            transport.close();
            self.set_state(ConnectionState::Disconnected);
            info!("disconnected");
            self.handler.on_close();
        }
    }

    fn send(&mut self, frame: Frame) {
        let connected = self.current_state() == ConnectionState::Connected;
        match self.transport.as_mut() {
            Some(transport) if connected => {
                if let Err(e) = transport.send(frame) {
                    warn!(%e, "failed to send frame");
                }
            }
            _ => warn!("channel is not connected; dropping frame"),
        }
    }

    fn check_and_reconnect(&mut self) {
        if self.transport.is_none() || self.current_state() != ConnectionState::Connected {
            info!("not connected after becoming visible, attempting to reconnect");
            self.connect();
        }
    }

    fn handle_event(&mut self, generation: u64, event: TransportEvent) {
        if generation != self.generation || self.transport.is_none() {
            debug!(generation, ?event, "ignoring event from released transport");
            return;
        }

        match event {
            TransportEvent::Opened => {
                self.set_state(ConnectionState::Connected);
                self.cancel_reconnect();
                info!(url = %self.endpoint, "connected");
                self.handler.on_open();
            }
            TransportEvent::Message(frame) => self.handler.on_message(frame),
            TransportEvent::Error(e) => {
                error!(%e, "transport error");
                self.handler.on_error(&e);
            }
            TransportEvent::Closed => {
                self.transport = None;
                self.set_state(ConnectionState::Disconnected);
                info!("connection closed");
                self.handler.on_close();
                self.schedule_reconnect();
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        if self.reconnect_interval.is_zero() {
            return;
        }

        self.reconnect_at = Some(Instant::now() + self.reconnect_interval);
        info!(
            delay_ms = u64::try_from(self.reconnect_interval.as_millis()).unwrap_or(u64::MAX),
            "reconnect scheduled"
        );
    }

    fn cancel_reconnect(&mut self) {
        if self.reconnect_at.take().is_some() {
            debug!("pending reconnect cancelled");
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn visibility_changed(
    observer: &mut Option<watch::Receiver<Visibility>>,
) -> Option<Visibility> {
    match observer {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(*rx.borrow_and_update()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}
