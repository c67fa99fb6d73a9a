//! Error types for the lobby layer.
//!
//! Client-visible failures are not Rust errors — they are `error` frames
//! from the protocol taxonomy, enqueued on the offending client's outbound
//! queue. This enum covers the few operations with a caller to report to.

/// Errors returned by [`PartyManagerHandle`](crate::PartyManagerHandle)
/// request/reply operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The coordinator task is gone (its channel closed).
    #[error("coordinator unavailable")]
    Unavailable,
}
