//! # Parlor
//!
//! Realtime lobby-and-session server for a multiplayer card game.
//!
//! Clients connect over a WebSocket, receive a server-issued identity and
//! secret, and move through three lifecycle stages: connected → party
//! member → game participant. The server handles matchmaking (public
//! queue or explicit party id), host election and transfer, session
//! persistence across brief disconnects, and teardown when parties empty
//! or games lose quorum.
//!
//! ```rust,no_run
//! use parlor::ServerBuilder;
//!
//! # async fn run() -> Result<(), parlor::ServerError> {
//! let server = ServerBuilder::new().bind("0.0.0.0:8080").build().await?;
//! server.run().await
//! # }
//! ```

mod endpoint;
mod error;
mod server;

pub use error::ServerError;
pub use server::{Server, ServerBuilder};
