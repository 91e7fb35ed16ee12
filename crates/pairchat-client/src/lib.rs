//! # pairchat-client
//!
//! The client half of the pairing chat protocol.
//!
//! - [`SessionClient`] owns the single WebSocket connection for a credential
//!   and folds inbound frames into a [`pairchat_core::SessionState`] that
//!   callers observe through a `watch` channel.
//! - [`Connector`] is the transport seam; [`WsConnector`] is the
//!   `tokio-tungstenite` implementation.
//! - [`CredentialStore`] persists the login credential.
//! - [`AuthShell`] ties login/logout to the session client's lifecycle.
//!
//! Transport failures never surface as errors from the session client; they
//! show up as [`pairchat_core::Status::Disconnected`].

#![deny(unsafe_code)]

pub mod errors;
pub mod session;
pub mod shell;
pub mod storage;
pub mod transport;

pub use errors::{ShellError, StorageError, TransportError};
pub use session::{SessionClient, SessionConfig};
pub use shell::AuthShell;
pub use storage::{CredentialStore, StoredCredential};
pub use transport::{Connector, Link, WsConnector, session_url};
