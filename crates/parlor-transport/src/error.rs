/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener or accepting a connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket upgrade handshake failed (bad path, bad headers).
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// The peer sent a frame larger than the inbound limit.
    #[error("frame of {0} bytes exceeds the read limit")]
    FrameTooLarge(usize),

    /// Nothing arrived within the read-side idle limit.
    #[error("connection idle past the read deadline")]
    IdleTimeout,
}
