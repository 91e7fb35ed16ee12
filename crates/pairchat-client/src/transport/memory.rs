//! In-memory connector for unit tests.
//!
//! Each successful `connect` hands the test a [`ServerEnd`] through which it
//! can push inbound frames, read outbound frames, and close the link.

use async_trait::async_trait;
use futures::channel::mpsc as fmpsc;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::{Connector, Link};
use crate::errors::TransportError;

/// Server side of one in-memory link.
pub(crate) struct ServerEnd {
    pub url: String,
    to_client: fmpsc::UnboundedSender<Result<String, TransportError>>,
    from_client: fmpsc::UnboundedReceiver<String>,
}

impl ServerEnd {
    /// Deliver a text frame to the client.
    pub fn push(&self, text: &str) {
        let _ = self.to_client.unbounded_send(Ok(text.to_owned()));
    }

    /// Deliver a read error to the client.
    pub fn fail(&self, reason: &str) {
        let _ = self
            .to_client
            .unbounded_send(Err(TransportError::Receive(reason.to_owned())));
    }

    /// Close the server side; the client's inbound stream ends.
    pub fn close(&self) {
        self.to_client.close_channel();
    }

    /// Next outbound frame, or `None` once the client side is gone.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.from_client.next().await
    }

    /// Outbound frames already queued, without waiting.
    pub fn drain_sent(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(Some(text)) = self.from_client.try_next() {
            out.push(text);
        }
        out
    }
}

/// How the connector answers `connect`.
#[derive(Clone, Copy)]
pub(crate) enum Mode {
    Accept,
    Refuse,
    Hang,
}

pub(crate) struct MemoryConnector {
    mode: Mode,
    accepted: mpsc::UnboundedSender<ServerEnd>,
}

impl MemoryConnector {
    pub fn new(mode: Mode) -> (Self, mpsc::UnboundedReceiver<ServerEnd>) {
        let (accepted, rx) = mpsc::unbounded_channel();
        (Self { mode, accepted }, rx)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Link, TransportError> {
        match self.mode {
            Mode::Accept => {}
            Mode::Refuse => {
                return Err(TransportError::Connect {
                    endpoint: super::redact_url(url),
                    reason: "connection refused".into(),
                });
            }
            Mode::Hang => futures::future::pending::<()>().await,
        }

        let (to_client, inbound) = fmpsc::unbounded();
        let (outbound, from_client) = fmpsc::unbounded::<String>();
        let _ = self.accepted.send(ServerEnd {
            url: url.to_owned(),
            to_client,
            from_client,
        });
        Ok(Link {
            sink: Box::pin(outbound.sink_map_err(|e| TransportError::Send(e.to_string()))),
            stream: Box::pin(inbound),
        })
    }
}
