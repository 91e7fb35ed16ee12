//! # pairchat-core
//!
//! Foundation types for the pairchat client. Nothing in this crate performs
//! I/O; the transport and the HTTP surface live in `pairchat-client` and
//! `pairchat-api`.
//!
//! - **Branded IDs**: [`SessionId`] and the redacting [`Credential`] newtype
//! - **Protocol**: [`InboundFrame`] / [`OutboundFrame`] JSON frames
//! - **State machine**: [`SessionState`], a reducer over [`ClientEvent`]s with
//!   a derived [`Status`]
//! - **Errors**: [`ProtocolError`] via `thiserror`
//! - **Logging**: `tracing` subscriber setup and a log-capture test utility

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod protocol;
pub mod state;

pub use errors::ProtocolError;
pub use ids::{Credential, SessionId};
pub use protocol::{InboundFrame, OutboundFrame};
pub use state::{
    ClientEvent, FinishedSession, Ignored, Liveness, Pairing, PairingSession, SessionState, Status,
    Transcript, TranscriptEntry, Transition, reduce,
};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
