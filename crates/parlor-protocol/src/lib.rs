//! Wire protocol for Parlor.
//!
//! This crate defines the frames that travel between a game client and the
//! lobby server, plus the codec that converts them to and from JSON text:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], the id newtypes) —
//!   the message structures on the wire.
//! - **Codec** ([`encode_server`], [`decode_client`]) — pure functions,
//!   no shared state.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while decoding,
//!   with enough context to echo the offending request tag back to the
//!   client.
//!
//! The protocol layer sits below everything else: it knows nothing about
//! connections, parties, or games.

mod codec;
mod error;
mod types;

pub use codec::{decode_client, decode_server, encode_server};
pub use error::ProtocolError;
pub use types::{
    ClientId, ClientMessage, ErrorCode, GameId, PartyId, PartyLeftReason,
    PartyMemberInfo, SecretKey, ServerMessage,
};
