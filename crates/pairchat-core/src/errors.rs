//! Protocol error types.

use thiserror::Error;

/// Errors decoding or encoding a WebSocket frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame was not valid JSON.
    #[error("invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame had no string `type` discriminator.
    #[error("frame has no `type` field")]
    MissingType,

    /// The `type` discriminator named a kind this client does not handle.
    #[error("unrecognized frame type: {0}")]
    UnknownType(String),

    /// The frame kind was known but its fields did not match.
    #[error("invalid `{kind}` frame: {source}")]
    InvalidFields {
        /// The frame's `type` value.
        kind: String,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
