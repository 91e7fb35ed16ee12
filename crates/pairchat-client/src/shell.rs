//! Auth shell: ties the credential lifecycle to the session client.
//!
//! Logging in persists the credential and starts the client. Logging out
//! stops the client and forgets the credential. [`AuthShell::sign_in`] only
//! persists, for callers that connect later through
//! [`AuthShell::restore`], such as a one-shot `login` command.

use pairchat_api::{ApiClient, TokenResponse};
use pairchat_core::Credential;
use tracing::{info, instrument};

use crate::errors::{ShellError, StorageError};
use crate::session::SessionClient;
use crate::storage::{CredentialStore, StoredCredential};

/// Owns the credential store and the session client.
pub struct AuthShell {
    store: CredentialStore,
    client: SessionClient,
}

impl AuthShell {
    /// Create a shell. Nothing connects until a credential is supplied.
    pub fn new(store: CredentialStore, client: SessionClient) -> Self {
        Self { store, client }
    }

    /// The session client.
    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    /// The session client, mutably.
    pub fn client_mut(&mut self) -> &mut SessionClient {
        &mut self.client
    }

    /// The credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Stored username, if any.
    pub fn username(&self) -> Option<String> {
        self.store.load().and_then(|s| s.username)
    }

    /// Stored credential, if any.
    pub fn credential(&self) -> Option<Credential> {
        self.store.load().map(|s| s.access_token)
    }

    /// Persist `credential`, then start the session client with it.
    pub async fn on_authenticated(&mut self, credential: Credential) -> Result<(), StorageError> {
        self.authenticate(StoredCredential::new(credential)).await
    }

    async fn authenticate(&mut self, stored: StoredCredential) -> Result<(), StorageError> {
        let stored = self.remember(stored)?;
        self.client.start(stored.access_token).await;
        Ok(())
    }

    fn remember(&self, mut stored: StoredCredential) -> Result<StoredCredential, StorageError> {
        self.store.save(&mut stored)?;
        info!(username = stored.username.as_deref(), "credential stored");
        Ok(stored)
    }

    /// Stop the session client, then clear the stored credential. Idempotent.
    pub async fn on_logged_out(&mut self) -> Result<(), StorageError> {
        self.client.stop().await;
        self.store.clear()?;
        info!("logged out");
        Ok(())
    }

    /// Start the client with the stored credential, if there is one.
    pub async fn restore(&mut self) -> bool {
        let Some(stored) = self.store.load() else {
            return false;
        };
        self.client.start(stored.access_token).await;
        true
    }

    /// Exchange username and password for a credential and store it without
    /// connecting. The next [`restore`](Self::restore) picks it up.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn sign_in(
        &self,
        api: &ApiClient,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, ShellError> {
        let token = api.login(username, password).await?;
        let _ = self.remember(StoredCredential::from_token(username, &token))?;
        Ok(token)
    }

    /// Exchange username and password for a credential, then authenticate.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn login(
        &mut self,
        api: &ApiClient,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, ShellError> {
        let token = api.login(username, password).await?;
        self.authenticate(StoredCredential::from_token(username, &token))
            .await?;
        Ok(token)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
