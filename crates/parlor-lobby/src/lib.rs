//! Lobby and session coordination for Parlor.
//!
//! This crate is the server's core: the single-writer [`PartyManager`]
//! that owns every party, game, membership index, and abandonment entry,
//! plus the data and actor types it coordinates:
//!
//! - [`Client`] — one connected session (identity, secret, outbound queue).
//! - `Party` — a pre-game lobby, pure data mutated only by the coordinator.
//! - [`Game`](game) — an active session running as its own task.
//!
//! Nothing here touches the network. Connection handling lives a layer up;
//! it talks to this crate exclusively through [`PartyManagerHandle`] and
//! each client's outbound queue. The only cross-task mutation in the whole
//! design is the reconnect graft on a `Client`, guarded by that client's
//! own mutex.

mod client;
mod config;
mod coordinator;
mod error;
mod game;
mod party;

pub use client::{Client, ClientSeat, SEND_QUEUE_SIZE};
pub use config::LobbyConfig;
pub use coordinator::{
    LobbySnapshot, PartyManager, PartyManagerHandle, PartySnapshot,
};
pub use error::LobbyError;
pub use game::GameHandle;
