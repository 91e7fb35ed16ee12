//! API error types.

/// Errors from calls to the pairchat HTTP API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the response body not read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the expected JSON shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {detail}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The server's `detail` message, or the raw body.
        detail: String,
    },

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was rejected before being sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Whether the server rejected the credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        let err = ApiError::Status {
            status: 400,
            detail: "Incorrect username or password".into(),
        };
        assert_eq!(
            err.to_string(),
            "server returned 400: Incorrect username or password"
        );
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn unauthorized_detection() {
        let err = ApiError::Status {
            status: 401,
            detail: "Could not validate credentials".into(),
        };
        assert!(err.is_unauthorized());
    }

    #[test]
    fn not_found_display() {
        let err = ApiError::NotFound("chat session s1".into());
        assert_eq!(err.to_string(), "not found: chat session s1");
    }
}
