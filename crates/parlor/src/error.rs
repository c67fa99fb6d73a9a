//! Unified error type for the server layer.

use parlor_transport::TransportError;

/// Top-level error for building and running a server.
///
/// Per-connection and per-request failures never surface here — they are
/// answered with protocol `error` frames or end the one connection.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A transport-level failure (bind, accept).
    #[error(transparent)]
    Transport(#[from] TransportError),
}
