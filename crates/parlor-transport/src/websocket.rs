//! WebSocket listener and connection built on `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tokio_tungstenite::WebSocketStream;

use crate::{ConnectionId, TransportError};

/// Counter for generating unique connection ids.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Maximum size of an inbound frame. Lobby requests are small; anything
/// bigger is a misbehaving client.
pub const MAX_FRAME_BYTES: usize = 512;

/// Read-side idle limit. Any inbound frame — pongs included — restarts
/// it, so a peer answering keep-alive pings is never cut off.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

type WsStream = WebSocketStream<TcpStream>;

/// Listens for WebSocket upgrades on a single path.
pub struct WsListener {
    listener: TcpListener,
    path: String,
}

impl WsListener {
    /// Binds to `addr` and accepts upgrades on `path` (e.g. `/ws`).
    pub async fn bind(addr: &str, path: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, path, "WebSocket listener bound");
        Ok(Self {
            listener,
            path: path.to_string(),
        })
    }

    /// The address the listener is actually bound to (useful with port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts the next connection and performs the WebSocket handshake.
    ///
    /// A request for any path other than the configured one is refused
    /// with a 404 during the handshake.
    pub async fn accept(&mut self) -> Result<WsConnection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let expected = self.path.clone();
        let check_path = move |req: &Request,
                               resp: Response|
              -> Result<Response, ErrorResponse> {
            if req.uri().path() == expected {
                Ok(resp)
            } else {
                let mut refusal =
                    ErrorResponse::new(Some("no such endpoint".to_string()));
                *refusal.status_mut() = StatusCode::NOT_FOUND;
                Err(refusal)
            }
        };

        let ws = tokio_tungstenite::accept_hdr_async(stream, check_path)
            .await
            .map_err(|e| TransportError::HandshakeFailed(e.to_string()))?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %peer, "accepted WebSocket connection");

        Ok(WsConnection { id, ws })
    }
}

/// A single upgraded connection.
pub struct WsConnection {
    id: ConnectionId,
    ws: WsStream,
}

impl WsConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Splits the connection into its write and read halves.
    pub fn split(self) -> (FrameSink, FrameSource) {
        let (sink, stream) = self.ws.split();
        (
            FrameSink { ws: sink },
            FrameSource {
                ws: stream,
                max_frame_bytes: MAX_FRAME_BYTES,
                idle_timeout: IDLE_TIMEOUT,
            },
        )
    }
}

/// The write half of a connection. Sole writer to the socket.
pub struct FrameSink {
    ws: SplitSink<WsStream, Message>,
}

impl FrameSink {
    /// Sends one text frame.
    pub async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.ws
            .send(Message::text(text))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    /// Sends a keep-alive ping.
    pub async fn ping(&mut self) -> Result<(), TransportError> {
        self.ws
            .send(Message::Ping(Bytes::new()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    /// Closes the connection cleanly.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.ws
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}

/// The read half of a connection. Sole reader from the socket.
pub struct FrameSource {
    ws: SplitStream<WsStream>,
    max_frame_bytes: usize,
    idle_timeout: Duration,
}

impl FrameSource {
    /// Overrides the idle limit (tests use a short one).
    pub fn set_idle_timeout(&mut self, idle_timeout: Duration) {
        self.idle_timeout = idle_timeout;
    }

    /// Receives the next text payload.
    ///
    /// Binary frames are interpreted as UTF-8 text (lossily, so malformed
    /// bytes surface downstream as a decode error rather than a hang).
    /// Ping/pong frames are skipped but still restart the idle timer.
    /// Returns `Ok(None)` on clean close.
    pub async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            let next = tokio::time::timeout(self.idle_timeout, self.ws.next())
                .await
                .map_err(|_| TransportError::IdleTimeout)?;
            match next {
                Some(Ok(Message::Text(text))) => {
                    if text.len() > self.max_frame_bytes {
                        return Err(TransportError::FrameTooLarge(text.len()));
                    }
                    return Ok(Some(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(data))) => {
                    if data.len() > self.max_frame_bytes {
                        return Err(TransportError::FrameTooLarge(data.len()));
                    }
                    return Ok(Some(
                        String::from_utf8_lossy(&data).into_owned(),
                    ));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
            }
        }
    }
}
