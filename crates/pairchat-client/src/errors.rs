//! Client error types.

use thiserror::Error;

/// Transport failures. These stay inside the session client and are turned
/// into a `disconnected` status; they are public for [`crate::Connector`]
/// implementors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The WebSocket handshake failed.
    #[error("connect to {endpoint} failed: {reason}")]
    Connect {
        /// Endpoint with the credential stripped.
        endpoint: String,
        /// Why it failed.
        reason: String,
    },
    /// Writing a frame failed.
    #[error("send failed: {0}")]
    Send(String),
    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    Receive(String),
}

/// Credential file failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of auth shell operations.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The login request failed.
    #[error("login failed: {0}")]
    Api(#[from] pairchat_api::ApiError),
    /// The credential could not be stored or cleared.
    #[error("credential storage failed: {0}")]
    Storage(#[from] StorageError),
}
