//! Settings type definitions.
//!
//! Field names are camelCase in JSON. Every section is `#[serde(default)]`
//! so a settings file only needs the values it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PairchatSettings {
    /// Server endpoints.
    pub server: ServerSettings,
    /// Session client behaviour.
    pub client: ClientSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Directory for the stored credential. Defaults to `~/.pairchat`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl PairchatSettings {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let http = &self.server.http_url;
        if !(http.starts_with("http://") || http.starts_with("https://")) {
            return Err(SettingsError::InvalidValue(format!(
                "httpUrl must be an http(s) URL, got {http:?}"
            )));
        }
        let ws = &self.server.ws_url;
        if !(ws.starts_with("ws://") || ws.starts_with("wss://")) {
            return Err(SettingsError::InvalidValue(format!(
                "wsUrl must be a ws(s) URL, got {ws:?}"
            )));
        }
        if self.client.outbound_buffer == 0 {
            return Err(SettingsError::InvalidValue(
                "outboundBuffer must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Server endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Base URL of the HTTP API (login, register, records).
    pub http_url: String,
    /// Base URL of the WebSocket endpoint; `/ws/{credential}` is appended.
    pub ws_url: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_url: "http://localhost:8000".to_string(),
            ws_url: "ws://localhost:8000".to_string(),
        }
    }
}

/// Session client behaviour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Upper bound on the WebSocket handshake, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Capacity of the outbound frame queue.
    pub outbound_buffer: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            outbound_buffer: 256,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
