//! # pairchat-api
//!
//! HTTP client for the pairchat server's REST surface.
//!
//! - **Auth**: `POST /token` (form login) and `POST /register`
//! - **Records**: `POST /chat-sessions`, `GET /chat-sessions/{id}`,
//!   `POST /ratings`, all bearer-authenticated with the login credential
//!
//! The WebSocket side of the protocol lives in `pairchat-client`.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod types;

pub use client::ApiClient;
pub use errors::ApiError;
pub use types::{
    ChatSessionRecord, CreatedChatSession, MessageResponse, Rating, RatingReceipt, TokenResponse,
};
