//! Request and response bodies.
//!
//! Field names follow the server's snake_case JSON.

use chrono::NaiveDateTime;
use pairchat_core::{Credential, SessionId, TranscriptEntry};
use serde::{Deserialize, Serialize};

/// Response of `POST /token`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Bearer token; also the WebSocket credential.
    pub access_token: String,
    /// Always `"bearer"`.
    pub token_type: String,
}

impl TokenResponse {
    /// The access token as a credential.
    pub fn credential(&self) -> Credential {
        Credential::new(self.access_token.clone())
    }
}

/// Body of `POST /register`. The server stores the password field verbatim.
#[derive(Clone, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub username: &'a str,
    pub hashed_password: &'a str,
}

/// Generic `{ "message": ... }` acknowledgement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

/// A finished conversation as stored by `POST /chat-sessions`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSessionRecord {
    /// Pairing session identifier.
    pub session_id: SessionId,
    /// First participant.
    pub user1: String,
    /// Second participant.
    pub user2: String,
    /// Whether the partner was an automated agent.
    pub is_ai: bool,
    /// Transcript lines.
    #[serde(default)]
    pub messages: Vec<TranscriptEntry>,
    /// Creation time (UTC, no offset on the wire).
    pub created_at: NaiveDateTime,
}

/// Response of `POST /chat-sessions`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreatedChatSession {
    /// Confirmation text.
    pub message: String,
    /// Storage identifier assigned by the server.
    pub session_id: String,
}

/// Body of `POST /ratings`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    /// Rated pairing session.
    pub session_id: SessionId,
    /// Rating user.
    pub user: String,
    /// Score from 1 to 5.
    pub rating: u8,
    /// Whether the user believes the partner was human.
    pub is_human_guess: bool,
}

impl Rating {
    /// Lowest accepted score.
    pub const MIN: u8 = 1;
    /// Highest accepted score.
    pub const MAX: u8 = 5;

    /// Whether the score is within range.
    pub fn is_valid(&self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self.rating)
    }
}

/// Response of `POST /ratings`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RatingReceipt {
    /// Confirmation text.
    pub message: String,
    /// Storage identifier assigned by the server.
    pub rating_id: String,
}
