//! Error types for the protocol layer.

/// Errors produced while encoding or decoding wire frames.
///
/// Decode failures distinguish the stage that failed: the outer frame
/// (no tag available), an unknown tag, or a payload that does not match
/// the schema for its tag. The tag, when known, is what the server echoes
/// back in `error.requestType`.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of an outbound message failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The outer `{type, payload}` frame could not be parsed.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    /// The frame parsed but its `type` tag is not part of the protocol.
    #[error("unknown message type {tag:?}")]
    UnknownType { tag: String },

    /// The payload does not match the schema for its tag.
    #[error("invalid payload for {tag:?}: {source}")]
    InvalidPayload {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// The inbound tag associated with the failure, if the outer frame
    /// got far enough to reveal one.
    pub fn request_tag(&self) -> Option<&str> {
        match self {
            Self::UnknownType { tag } | Self::InvalidPayload { tag, .. } => {
                Some(tag)
            }
            _ => None,
        }
    }
}
