//! Core wire types: identity newtypes and the client/server frame unions.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Server-issued identifier for a client session.
///
/// Opaque uuid string. Issued on connect and stable across reconnects
/// within the abandonment grace window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unguessable token paired with a [`ClientId`], used only to authorize
/// reconnects. Never sent to anyone but the owning client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretKey(pub String);

impl SecretKey {
    /// Generates a fresh random secret (uuid v4, 122 bits of entropy).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Identifier for a party (pre-game lobby).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub String);

impl PartyId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for a game (active session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub String);

impl GameId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Inbound (client → server)
// ---------------------------------------------------------------------------

/// A decoded client request.
///
/// Produced by [`decode_client`](crate::decode_client); the two-stage
/// decoder has already validated the payload shape, so downstream
/// dispatchers never need fallible downcasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Join the public queue (no fields), a specific party (`party_id`),
    /// or reclaim an abandoned session (`client_id` + `secret`).
    Join {
        party_id: Option<PartyId>,
        client_id: Option<ClientId>,
        secret: Option<SecretKey>,
    },
    /// Leave the current party.
    Leave,
    /// Start a game in the current party (host only).
    StartGame,
    /// An in-game action, routed to the client's game.
    PlayerAction { action: String },
}

impl ClientMessage {
    /// The wire tag for this message, as echoed in `error.requestType`.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave => "leave",
            Self::StartGame => "startGame",
            Self::PlayerAction { .. } => "playerAction",
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound (server → client)
// ---------------------------------------------------------------------------

/// Why a client left its party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartyLeftReason {
    SelfInitiated,
    PartyDisbanded,
}

/// Error codes carried in `error.code`.
///
/// Client-caused failures are reported with one of these and the
/// connection stays open; none of them is fatal to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    /// Malformed frame, unknown tag, or payload shape mismatch.
    InvalidRequest,
    /// Join attempted while already placed in a party.
    AlreadyInParty,
    /// Target party id does not resolve.
    PartyNotFound,
    /// Target party is at capacity.
    PartyFull,
    /// The public-queue buffer is saturated.
    QueueFull,
    /// Operation requires party membership.
    NotInSession,
    /// Operation requires an active game.
    NotInGame,
    /// Operation is host-only.
    NotPartyHost,
    /// Start requested below the minimum party size.
    NotEnoughMembers,
    /// Reconnect after the grace window, or with a wrong secret.
    SessionExpired,
    /// Join refused because the target party's game is running.
    GameInProgress,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidRequest => "invalidRequest",
            Self::AlreadyInParty => "alreadyInParty",
            Self::PartyNotFound => "partyNotFound",
            Self::PartyFull => "partyFull",
            Self::QueueFull => "queueFull",
            Self::NotInSession => "notInSession",
            Self::NotInGame => "notInGame",
            Self::NotPartyHost => "notPartyHost",
            Self::NotEnoughMembers => "notEnoughMembers",
            Self::SessionExpired => "sessionExpired",
            Self::GameInProgress => "gameInProgress",
        };
        f.write_str(s)
    }
}

/// One row of a `memberUpdate` broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyMemberInfo {
    pub id: ClientId,
    pub is_host: bool,
    pub is_connected: bool,
}

/// A server → client frame.
///
/// Serializes as `{ "type": "<tag>", "payload": { ... } }` with camelCase
/// tags and payload fields, matching the client SDK's expectations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent once, immediately after the connection is accepted.
    #[serde(rename_all = "camelCase")]
    ConnectSuccess {
        client_id: ClientId,
        secret_key: SecretKey,
    },
    /// The client was accepted onto the public queue.
    QueueJoined {},
    /// The client now holds a seat in the given party.
    #[serde(rename_all = "camelCase")]
    PartyJoined { party_id: PartyId },
    /// The client no longer holds a seat.
    PartyLeft { reason: PartyLeftReason },
    /// Full membership roster, sent after every membership or
    /// connection-status change.
    MemberUpdate { members: Vec<PartyMemberInfo> },
    /// The party's game is starting after a short countdown.
    #[serde(rename_all = "camelCase")]
    GameStarted {
        countdown_seconds: u32,
        /// Unix milliseconds at the moment the start was processed.
        timestamp: i64,
    },
    /// The game ended. `winner_id` is empty until a rules engine exists.
    #[serde(rename_all = "camelCase")]
    GameOver { winner_id: String, reason: String },
    /// A request failed; the connection stays open.
    #[serde(rename_all = "camelCase")]
    Error {
        code: ErrorCode,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_type: Option<String>,
    },
}

// =========================================================================
// Tests
// =========================================================================
