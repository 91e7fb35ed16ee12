//! Transport seam between the session client and the network.
//!
//! A [`Connector`] turns an endpoint URL into a [`Link`]: a sink of outbound
//! text frames and a stream of inbound text frames. The stream ends when the
//! peer closes the connection.

mod ws;

#[cfg(test)]
pub(crate) mod memory;

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};
use pairchat_core::Credential;

use crate::errors::TransportError;

pub use ws::WsConnector;

/// Outbound half of a connection.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half of a connection.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// An established connection.
pub struct Link {
    /// Outbound text frames.
    pub sink: FrameSink,
    /// Inbound text frames; `None` once the peer has closed.
    pub stream: FrameStream,
}

/// Opens connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a connection to `url`.
    async fn connect(&self, url: &str) -> Result<Link, TransportError>;
}

/// WebSocket URL for a credential: `{ws_base}/ws/{credential}`.
pub fn session_url(ws_base: &str, credential: &Credential) -> String {
    format!(
        "{}/ws/{}",
        ws_base.trim_end_matches('/'),
        credential.expose()
    )
}

/// Strip the credential path segment so a URL can be logged.
pub(crate) fn redact_url(url: &str) -> String {
    match url.rfind("/ws/") {
        Some(idx) => format!("{}/ws/<credential>", &url[..idx]),
        None => url.to_owned(),
    }
}
