//! `reqwest`-based API client.

use pairchat_core::{Credential, SessionId};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::errors::ApiError;
use crate::types::{
    ChatSessionRecord, CreatedChatSession, MessageResponse, Rating, RatingReceipt,
    RegisterRequest, TokenResponse,
};

/// Client for the pairchat HTTP API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http, base_url }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// URL with each of `segments` appended as one percent-encoded path
    /// segment.
    fn segment_url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let invalid = || ApiError::InvalidRequest(format!("bad base URL {}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        let _ = url
            .path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Exchange a username and password for a credential.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let req = self
            .http
            .post(self.url("/token"))
            .form(&[("username", username), ("password", password)]);
        send_json(req).await
    }

    /// Create an account.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<MessageResponse, ApiError> {
        let req = self.http.post(self.url("/register")).json(&RegisterRequest {
            username,
            hashed_password: password,
        });
        send_json(req).await
    }

    /// Store a finished conversation.
    #[instrument(skip_all, fields(session_id = %record.session_id))]
    pub async fn create_chat_session(
        &self,
        credential: &Credential,
        record: &ChatSessionRecord,
    ) -> Result<CreatedChatSession, ApiError> {
        let req = self
            .http
            .post(self.url("/chat-sessions"))
            .bearer_auth(credential.expose())
            .json(record);
        send_json(req).await
    }

    /// Fetch a stored conversation.
    #[instrument(skip(self, credential))]
    pub async fn get_chat_session(
        &self,
        credential: &Credential,
        session_id: &SessionId,
    ) -> Result<ChatSessionRecord, ApiError> {
        let url = self.segment_url(&["chat-sessions", session_id.as_str()])?;
        let req = self.http.get(url).bearer_auth(credential.expose());
        match send_json(req).await {
            Err(ApiError::Status { status: 404, .. }) => {
                Err(ApiError::NotFound(format!("chat session {session_id}")))
            }
            other => other,
        }
    }

    /// Rate a conversation. Scores outside 1..=5 are rejected locally.
    #[instrument(skip_all, fields(session_id = %rating.session_id, rating = rating.rating))]
    pub async fn submit_rating(
        &self,
        credential: &Credential,
        rating: &Rating,
    ) -> Result<RatingReceipt, ApiError> {
        if !rating.is_valid() {
            return Err(ApiError::InvalidRequest(format!(
                "rating must be between {} and {}, got {}",
                Rating::MIN,
                Rating::MAX,
                rating.rating
            )));
        }
        let req = self
            .http
            .post(self.url("/ratings"))
            .bearer_auth(credential.expose())
            .json(rating);
        send_json(req).await
    }
}

async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ApiError> {
    let resp = req.send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    debug!(status = status.as_u16(), len = body.len(), "api response");

    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            detail: extract_detail(status, &body),
        });
    }
    Ok(serde_json::from_str(&body)?)
}

/// Pull the `detail` string out of an error body, falling back to the raw
/// body or the status reason.
fn extract_detail(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    match parsed.as_ref().and_then(|v| v.get("detail")) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None if !body.trim().is_empty() => body.trim().to_owned(),
        None => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_owned(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
