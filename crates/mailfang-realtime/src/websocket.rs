//! WebSocket transport built on tokio-tungstenite.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

use crate::transport::{Connector, Frame, Transport, TransportError, TransportEvents};

/// Opens WebSocket connections on the current tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Creates a connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    fn open(&mut self, url: &Url, events: TransportEvents) -> Box<dyn Transport> {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(url.to_string(), events, outbound_rx));
        Box::new(WebSocketTransport {
            outbound: outbound_tx,
        })
    }
}

#[derive(Debug)]
enum Outbound {
    Frame(Frame),
    Close,
}

/// Owner side of a socket task. Dropping it closes the socket.
#[derive(Debug)]
struct WebSocketTransport {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Transport for WebSocketTransport {
    fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::new("connection is closed"))
    }

    fn close(&mut self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}

async fn run_socket(
    url: String,
    events: TransportEvents,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let stream = tokio::select! {
        result = connect_async(url.as_str()) => match result {
            Ok((stream, response)) => {
                debug!(%url, status = %response.status(), "handshake complete");
                stream
            }
            Err(e) => {
                warn!(%url, %e, "connection failed");
                events.error(e);
                events.closed();
                return;
            }
        },
        () = released_by_owner(&mut outbound) => {
            debug!(%url, "connection abandoned before open");
            events.closed();
            return;
        }
    };

    events.opened();
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            inbound = source.next() => match inbound {
                Some(Ok(Message::Text(text))) => events.message(Frame::Text(text)),
                Some(Ok(Message::Binary(data))) => events.message(Frame::Binary(data)),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "server closed connection");
                    break;
                }
                // Ping and pong are answered by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    events.error(e);
                    break;
                }
                None => break,
            },
            command = outbound.recv() => match command {
                Some(Outbound::Frame(frame)) => {
                    let message = match frame {
                        Frame::Text(text) => Message::Text(text),
                        Frame::Binary(data) => Message::Binary(data),
                    };
                    if let Err(e) = sink.send(message).await {
                        events.error(e);
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(e) = sink.close().await {
                        debug!(%e, "close handshake failed");
                    }
                    break;
                }
            },
        }
    }

    events.closed();
}

/// Resolves once the owner closes or drops the transport.
async fn released_by_owner(outbound: &mut mpsc::UnboundedReceiver<Outbound>) {
    while let Some(Outbound::Frame(_)) = outbound.recv().await {
        debug!("dropping frame queued before open");
    }
}
