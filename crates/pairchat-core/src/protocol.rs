//! WebSocket frame codec.
//!
//! Every frame is a UTF-8 JSON object with a `type` discriminator. The server
//! sends `session_start`, `chat_message` and `session_end`; the client sends
//! `chat_message` and `end_session`.
//!
//! The server also stamps `session_id` onto relayed chat messages and session
//! ends. The field is optional here so frames from servers that omit it still
//! decode.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProtocolError;
use crate::ids::SessionId;

/// Frame kinds accepted from the server.
const INBOUND_KINDS: &[&str] = &["session_start", "chat_message", "session_end"];

/// A frame received from the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// The server matched this user with a partner.
    SessionStart {
        /// Identifier of the new pairing session.
        session_id: SessionId,
        /// Display name of the other party.
        partner: String,
    },
    /// A chat line relayed by the server (including our own echoes).
    ChatMessage {
        /// Author of the line.
        user: String,
        /// Chat text.
        message: String,
        /// Session the line belongs to, when the server includes it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
    /// The pairing session is over.
    SessionEnd {
        /// Session that ended, when the server includes it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
}

impl InboundFrame {
    /// Decode a text frame.
    ///
    /// Distinguishes non-JSON input, a missing discriminator, an unknown
    /// kind, and a known kind with bad fields, so callers can log precisely.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?
            .to_owned();
        if !INBOUND_KINDS.contains(&kind.as_str()) {
            return Err(ProtocolError::UnknownType(kind));
        }
        serde_json::from_value(value)
            .map_err(|source| ProtocolError::InvalidFields { kind, source })
    }

    /// The wire `type` of this frame.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStart { .. } => "session_start",
            Self::ChatMessage { .. } => "chat_message",
            Self::SessionEnd { .. } => "session_end",
        }
    }
}

/// A frame sent to the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Send chat text to the partner.
    ChatMessage {
        /// Current pairing session.
        session_id: SessionId,
        /// Chat text.
        content: String,
    },
    /// Ask the server to end the pairing session.
    EndSession {
        /// Current pairing session.
        session_id: SessionId,
    },
}

impl OutboundFrame {
    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// The wire `type` of this frame.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChatMessage { .. } => "chat_message",
            Self::EndSession { .. } => "end_session",
        }
    }

    /// Session the frame is addressed to.
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::ChatMessage { session_id, .. } | Self::EndSession { session_id } => session_id,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
