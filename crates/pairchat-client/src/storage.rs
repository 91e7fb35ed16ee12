//! Credential file I/O.
//!
//! Reads and writes `<data_dir>/credentials.json` with file mode 0o600.

use std::path::{Path, PathBuf};

use pairchat_api::TokenResponse;
use pairchat_core::Credential;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::StorageError;

const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Current on-disk format.
pub const STORAGE_VERSION: u32 = 1;

/// Persisted login credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    /// Format version.
    pub version: u32,
    /// Account the credential belongs to, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Bearer token used for HTTP calls and the WebSocket path.
    pub access_token: Credential,
    /// Token type reported by the server.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// RFC 3339 timestamp of the last save.
    #[serde(default)]
    pub last_updated: String,
}

fn default_token_type() -> String {
    "bearer".into()
}

impl StoredCredential {
    /// Wrap a bare credential.
    pub fn new(access_token: Credential) -> Self {
        Self {
            version: STORAGE_VERSION,
            username: None,
            access_token,
            token_type: default_token_type(),
            last_updated: String::new(),
        }
    }

    /// Build from a token endpoint response.
    pub fn from_token(username: &str, token: &TokenResponse) -> Self {
        Self {
            username: Some(username.to_owned()),
            token_type: token.token_type.clone(),
            ..Self::new(token.credential())
        }
    }
}

/// The credentials file under a data directory.
#[derive(Clone, Debug)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store rooted at `data_dir`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(CREDENTIALS_FILE_NAME),
        }
    }

    /// Path of the credentials file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential.
    ///
    /// Returns `None` if the file doesn't exist, can't be parsed, has an
    /// unknown version, or holds an empty token.
    pub fn load(&self) -> Option<StoredCredential> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), "failed to read credentials file: {e}");
                return None;
            }
        };

        match serde_json::from_str::<StoredCredential>(&data) {
            Ok(stored) if stored.version != STORAGE_VERSION => {
                warn!("unsupported credentials version: {}", stored.version);
                None
            }
            Ok(stored) if stored.access_token.is_empty() => None,
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!(path = %self.path.display(), "failed to parse credentials file: {e}");
                None
            }
        }
    }

    /// Write `stored`, stamping `last_updated`. Creates parent directories.
    pub fn save(&self, stored: &mut StoredCredential) -> Result<(), StorageError> {
        stored.version = STORAGE_VERSION;
        stored.last_updated = chrono::Utc::now().to_rfc3339();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(stored)?;
        std::fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Delete the credentials file. A missing file is not an error.
    pub fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
