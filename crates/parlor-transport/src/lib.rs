//! WebSocket transport for Parlor.
//!
//! Wraps `tokio-tungstenite` behind the one operation the rest of the
//! server needs: accept a bidirectional text-frame channel. A connection
//! splits into a write half ([`FrameSink`]) and a read half
//! ([`FrameSource`]) so the per-client pumps each own exactly one side.

mod error;
mod websocket;

pub use error::TransportError;
pub use websocket::{FrameSink, FrameSource, WsConnection, WsListener};

use std::fmt;

/// Opaque process-local identifier for a connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
