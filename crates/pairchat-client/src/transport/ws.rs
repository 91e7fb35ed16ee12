//! `tokio-tungstenite` connector.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::debug;

use super::{Connector, Link, redact_url};
use crate::errors::TransportError;

/// Connects over WebSocket (`ws://` or `wss://`).
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Link, TransportError> {
        let (ws, response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect {
                endpoint: redact_url(url),
                reason: e.to_string(),
            })?;
        debug!(status = response.status().as_u16(), "websocket handshake complete");

        let (ws_tx, ws_rx) = ws.split();

        let sink = ws_tx
            .sink_map_err(|e| TransportError::Send(e.to_string()))
            .with(|text: String| {
                future::ready(Ok::<_, TransportError>(Message::Text(text.into())))
            });

        let stream = ws_rx
            .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
            .filter_map(|msg| future::ready(inbound_text(msg)));

        Ok(Link {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

/// Text of a data frame. Binary frames are accepted when they hold UTF-8;
/// control frames are skipped.
fn inbound_text(
    msg: Result<Message, tungstenite::Error>,
) -> Option<Result<String, TransportError>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
        Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
            Ok(text) => Some(Ok(text)),
            Err(_) => {
                debug!(len = data.len(), "skipping non-UTF-8 binary frame");
                None
            }
        },
        Ok(_) => None,
        Err(e) => Some(Err(TransportError::Receive(e.to_string()))),
    }
}
