//! JSON codec for the wire protocol.
//!
//! Pure functions, no shared state. Inbound decoding is two-stage: the
//! outer `{type, payload}` frame is parsed first, then the payload is
//! parsed against the schema keyed by the tag. This keeps the tag
//! available for `error.requestType` even when the payload is garbage,
//! and guarantees the dispatcher downstream never sees a half-validated
//! message.

use serde::Deserialize;

use crate::error::ProtocolError;
use crate::types::{ClientId, ClientMessage, PartyId, SecretKey, ServerMessage};

/// The outer shape of every inbound frame.
///
/// `payload` defaults to JSON `null` when absent so that a missing
/// payload surfaces as a payload-stage error (with the tag attached)
/// rather than a tagless frame error.
#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct JoinPayload {
    #[serde(default)]
    party_id: Option<PartyId>,
    #[serde(default)]
    client_id: Option<ClientId>,
    #[serde(default)]
    secret: Option<SecretKey>,
}

#[derive(Deserialize)]
struct LeavePayload {}

#[derive(Deserialize)]
struct StartGamePayload {}

#[derive(Deserialize)]
struct PlayerActionPayload {
    action: String,
}

/// Treats an absent or empty-string field as "not supplied".
///
/// Browser clients send `""` for fields they leave blank; the join
/// semantics only care whether a value was actually provided.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Decodes a client → server frame.
pub fn decode_client(text: &str) -> Result<ClientMessage, ProtocolError> {
    let RawFrame { tag, payload } =
        serde_json::from_str(text).map_err(ProtocolError::MalformedFrame)?;

    let invalid = |e| ProtocolError::InvalidPayload {
        tag: tag.clone(),
        source: e,
    };

    match tag.as_str() {
        "join" => {
            let p: JoinPayload =
                serde_json::from_value(payload).map_err(invalid)?;
            Ok(ClientMessage::Join {
                party_id: non_empty(p.party_id.map(|v| v.0)).map(PartyId),
                client_id: non_empty(p.client_id.map(|v| v.0)).map(ClientId),
                secret: non_empty(p.secret.map(|v| v.0)).map(SecretKey),
            })
        }
        "leave" => {
            let _: LeavePayload =
                serde_json::from_value(payload).map_err(invalid)?;
            Ok(ClientMessage::Leave)
        }
        "startGame" => {
            let _: StartGamePayload =
                serde_json::from_value(payload).map_err(invalid)?;
            Ok(ClientMessage::StartGame)
        }
        "playerAction" => {
            let p: PlayerActionPayload =
                serde_json::from_value(payload).map_err(invalid)?;
            Ok(ClientMessage::PlayerAction { action: p.action })
        }
        _ => Err(ProtocolError::UnknownType { tag: tag.clone() }),
    }
}

/// Encodes a server → client frame as JSON text.
pub fn encode_server(msg: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(ProtocolError::Encode)
}

/// Decodes a server → client frame. The server never calls this; it
/// exists for test clients and tooling.
pub fn decode_server(text: &str) -> Result<ServerMessage, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::MalformedFrame)
}

// =========================================================================
// Tests
// =========================================================================
