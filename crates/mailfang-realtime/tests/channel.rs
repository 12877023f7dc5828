//! Integration tests for the notification channel.
//!
//! A mock connector hands every connection attempt back to the test, which
//! then drives the transport lifecycle by hand. The tokio clock is paused so
//! reconnect timing is exact.

#![allow(clippy::unwrap_used, clippy::similar_names)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, advance};
use url::Url;

use mailfang_realtime::{
    Channel, ChannelConfig, ConnectionState, Connector, Error, Frame, Handler, Transport,
    TransportError, TransportEvents, Visibility,
};

const INTERVAL: Duration = Duration::from_millis(3000);

/// One connection attempt as seen by the test.
struct MockLink {
    url: Url,
    events: TransportEvents,
    sent: mpsc::UnboundedReceiver<Frame>,
    closed: Arc<AtomicBool>,
}

impl MockLink {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockConnector {
    links: mpsc::UnboundedSender<MockLink>,
}

struct MockTransport {
    sent: mpsc::UnboundedSender<Frame>,
    closed: Arc<AtomicBool>,
}

impl Transport for MockTransport {
    fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.sent
            .send(frame)
            .map_err(|_| TransportError::new("test dropped the link"))
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Connector for MockConnector {
    fn open(&mut self, url: &Url, events: TransportEvents) -> Box<dyn Transport> {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let _ = self.links.send(MockLink {
            url: url.clone(),
            events,
            sent: sent_rx,
            closed: Arc::clone(&closed),
        });
        Box::new(MockTransport {
            sent: sent_tx,
            closed,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Observed {
    Open,
    Message(Frame),
    Error(String),
    Close,
}

struct Recorder(mpsc::UnboundedSender<Observed>);

impl Handler for Recorder {
    fn on_message(&mut self, frame: Frame) {
        let _ = self.0.send(Observed::Message(frame));
    }

    fn on_open(&mut self) {
        let _ = self.0.send(Observed::Open);
    }

    fn on_error(&mut self, error: &TransportError) {
        let _ = self.0.send(Observed::Error(error.message().to_string()));
    }

    fn on_close(&mut self) {
        let _ = self.0.send(Observed::Close);
    }
}

struct Harness {
    channel: Channel,
    links: mpsc::UnboundedReceiver<MockLink>,
    observed: mpsc::UnboundedReceiver<Observed>,
}

fn origin() -> Url {
    Url::parse("http://localhost:3000").unwrap()
}

fn start(config: ChannelConfig) -> Harness {
    let (links_tx, links) = mpsc::unbounded_channel();
    let (observed_tx, observed) = mpsc::unbounded_channel();
    let channel = Channel::open(
        MockConnector { links: links_tx },
        Recorder(observed_tx),
        config,
    )
    .unwrap();
    Harness {
        channel,
        links,
        observed,
    }
}

fn start_default() -> Harness {
    start(ChannelConfig::new(origin()))
}

/// Lets the channel task drain everything queued so far.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

async fn open_link(harness: &mut Harness) -> MockLink {
    let link = harness.links.recv().await.unwrap();
    link.events.opened();
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Open);
    link
}

#[tokio::test(start_paused = true)]
async fn test_open_fires_on_open_and_connects() {
    let mut harness = start_default();

    let link = harness.links.recv().await.unwrap();
    assert_eq!(link.url.as_str(), "ws://localhost:3000/ws");
    assert_eq!(harness.channel.state(), ConnectionState::Connecting);
    assert!(!harness.channel.is_connected());

    link.events.opened();
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Open);
    assert!(harness.channel.is_connected());

    settle().await;
    assert!(harness.observed.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_messages_and_errors_reach_handler_in_order() {
    let mut harness = start_default();
    let link = open_link(&mut harness).await;

    let payload = r#"{"event":"new_mail","email":{"id":"abc"}}"#;
    link.events.message(Frame::from(payload));
    link.events.message(Frame::from(vec![1, 2, 3]));
    link.events.error(TransportError::new("reset by peer"));
    link.events.closed();

    assert_eq!(
        harness.observed.recv().await.unwrap(),
        Observed::Message(Frame::from(payload))
    );
    assert_eq!(
        harness.observed.recv().await.unwrap(),
        Observed::Message(Frame::Binary(vec![1, 2, 3]))
    );
    assert_eq!(
        harness.observed.recv().await.unwrap(),
        Observed::Error("reset by peer".to_string())
    );
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Close);
}

#[tokio::test(start_paused = true)]
async fn test_close_schedules_one_reconnect_after_interval() {
    let mut harness = start_default();
    let link = open_link(&mut harness).await;

    link.events.closed();
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Close);
    assert!(!harness.channel.is_connected());
    let closed_at = Instant::now();

    advance(INTERVAL - Duration::from_millis(1)).await;
    settle().await;
    assert!(harness.links.try_recv().is_err());

    let second = harness.links.recv().await.unwrap();
    assert!(Instant::now() - closed_at >= INTERVAL);
    assert_eq!(harness.channel.state(), ConnectionState::Connecting);

    // The new attempt is still opening; nothing else may be scheduled.
    advance(INTERVAL * 3).await;
    settle().await;
    assert!(harness.links.try_recv().is_err());
    assert!(!second.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_repeated_closes_keep_reconnecting() {
    let mut harness = start_default();
    let mut link = open_link(&mut harness).await;

    for _ in 0..3 {
        link.events.closed();
        assert_eq!(harness.observed.recv().await.unwrap(), Observed::Close);
        link = open_link(&mut harness).await;
        assert!(harness.channel.is_connected());
    }
    assert!(!link.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_failure_before_open_goes_through_close_path() {
    let mut harness = start_default();
    let link = harness.links.recv().await.unwrap();

    link.events.error(TransportError::new("connection refused"));
    link.events.closed();

    assert_eq!(
        harness.observed.recv().await.unwrap(),
        Observed::Error("connection refused".to_string())
    );
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Close);
    assert_eq!(harness.channel.state(), ConnectionState::Disconnected);

    let retry = harness.links.recv().await.unwrap();
    assert_eq!(retry.url, link.url);
}

#[tokio::test(start_paused = true)]
async fn test_manual_connect_cancels_pending_reconnect() {
    let mut harness = start_default();
    let link = open_link(&mut harness).await;

    link.events.closed();
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Close);

    harness.channel.connect();
    let manual = harness.links.recv().await.unwrap();
    manual.events.opened();
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Open);

    advance(INTERVAL * 2).await;
    settle().await;
    assert!(harness.links.try_recv().is_err());
    assert!(harness.channel.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_connect_while_connected_is_noop() {
    let mut harness = start_default();
    let link = open_link(&mut harness).await;

    harness.channel.connect();
    settle().await;

    assert!(harness.links.try_recv().is_err());
    assert!(!link.is_closed());
    assert!(harness.channel.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_prevents_reconnect() {
    let mut harness = start_default();
    let link = open_link(&mut harness).await;

    harness.channel.disconnect();
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Close);
    assert!(link.is_closed());
    assert!(!harness.channel.is_connected());

    // The transport confirming the close must not fire the handler again.
    link.events.closed();
    advance(INTERVAL * 2).await;
    settle().await;

    assert!(harness.links.try_recv().is_err());
    assert!(harness.observed.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_pending_reconnect() {
    let mut harness = start_default();
    let link = open_link(&mut harness).await;

    link.events.closed();
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Close);

    harness.channel.disconnect();
    harness.channel.disconnect();
    advance(INTERVAL * 2).await;
    settle().await;

    assert!(harness.links.try_recv().is_err());
    assert!(harness.observed.try_recv().is_err());
    assert_eq!(harness.channel.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_send_only_while_connected() {
    let mut harness = start(
        ChannelConfig::builder()
            .origin(origin())
            .auto_connect(false)
            .build(),
    );

    harness.channel.send("dropped");
    harness.channel.connect();

    let mut link = open_link(&mut harness).await;
    harness.channel.send("delivered");

    assert_eq!(link.sent.recv().await.unwrap(), Frame::from("delivered"));
    settle().await;
    assert!(link.sent.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_auto_connect_disabled() {
    let mut harness = start(
        ChannelConfig::builder()
            .origin(origin())
            .auto_connect(false)
            .build(),
    );

    settle().await;
    assert!(harness.links.try_recv().is_err());
    assert_eq!(harness.channel.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_events_from_replaced_transport_are_ignored() {
    let mut harness = start_default();
    let first = harness.links.recv().await.unwrap();

    // Still connecting, so this replaces the first attempt.
    harness.channel.connect();
    let second = harness.links.recv().await.unwrap();
    assert!(first.is_closed());
    assert!(second.events.generation() > first.events.generation());

    first.events.opened();
    first.events.message(Frame::from("stale"));
    first.events.closed();
    second.events.opened();

    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Open);
    settle().await;
    assert!(harness.observed.try_recv().is_err());
    assert!(harness.channel.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_disables_reconnect() {
    let mut harness = start(
        ChannelConfig::builder()
            .origin(origin())
            .reconnect_interval(Duration::ZERO)
            .build(),
    );
    let link = open_link(&mut harness).await;

    link.events.closed();
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Close);

    advance(Duration::from_secs(60)).await;
    settle().await;
    assert!(harness.links.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_becoming_visible_reconnects_dropped_channel() {
    let (visibility_tx, visibility_rx) = watch::channel(Visibility::Visible);
    let mut harness = start(
        ChannelConfig::builder()
            .origin(origin())
            .reconnect_interval(Duration::ZERO)
            .visibility(visibility_rx)
            .build(),
    );
    let link = open_link(&mut harness).await;

    visibility_tx.send(Visibility::Hidden).unwrap();
    link.events.closed();
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Close);
    settle().await;
    assert!(harness.links.try_recv().is_err());

    visibility_tx.send(Visibility::Visible).unwrap();
    let revived = harness.links.recv().await.unwrap();
    revived.events.opened();
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Open);
}

#[tokio::test(start_paused = true)]
async fn test_becoming_visible_while_connected_is_noop() {
    let (visibility_tx, visibility_rx) = watch::channel(Visibility::Visible);
    let mut harness = start(
        ChannelConfig::builder()
            .origin(origin())
            .visibility(visibility_rx)
            .build(),
    );
    let _link = open_link(&mut harness).await;

    visibility_tx.send(Visibility::Hidden).unwrap();
    settle().await;
    visibility_tx.send(Visibility::Visible).unwrap();
    settle().await;

    assert!(harness.links.try_recv().is_err());
    assert!(harness.channel.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_close_tears_down() {
    let mut harness = start_default();
    let link = open_link(&mut harness).await;
    let mut states = harness.channel.state_changes();

    harness.channel.close().await;

    assert!(link.is_closed());
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Close);
    assert_eq!(*states.borrow_and_update(), ConnectionState::Disconnected);

    advance(INTERVAL * 2).await;
    assert!(harness.links.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_drop_tears_down() {
    let mut harness = start_default();
    let link = harness.links.recv().await.unwrap();

    drop(harness.channel);
    settle().await;

    assert!(link.is_closed());
    assert_eq!(harness.observed.recv().await.unwrap(), Observed::Close);
    advance(INTERVAL * 2).await;
    settle().await;
    assert!(harness.links.try_recv().is_err());
}

#[tokio::test]
async fn test_open_requires_endpoint() {
    let (links_tx, _links) = mpsc::unbounded_channel();
    let result = Channel::open(
        MockConnector { links: links_tx },
        (),
        ChannelConfig::default(),
    );
    assert!(matches!(result, Err(Error::MissingEndpoint)));
}
