use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// User-facing message for a session that can no longer be refreshed.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your login has expired.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Http { status: StatusCode, message: String },

    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    SessionExpired,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error bodies from the notes API look like `{"message": "..."}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Build an `Http` error from a non-success response.
    ///
    /// Prefers the `message` field of a JSON body, falls back to the raw
    /// (truncated) body and finally to the status reason phrase.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => parsed.message,
            Err(_) if !body.trim().is_empty() => Self::truncate_body(body.trim()),
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string(),
        };
        ApiError::Http { status, message }
    }

    /// HTTP status associated with this failure, if any.
    ///
    /// `SessionExpired` reports 403, the status of the rejected refresh.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::SessionExpired => Some(StatusCode::FORBIDDEN),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Message suitable for showing to the user
    pub fn message(&self) -> String {
        match self {
            ApiError::Http { message, .. } => message.clone(),
            ApiError::SessionExpired => SESSION_EXPIRED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Http { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_uses_json_message() {
        let body = r#"{"message":"Title is required"}"#;
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(err.message(), "Title is required");
    }

    #[test]
    fn test_from_status_falls_back_to_body_then_reason() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(err.message(), "boom");

        let err = ApiError::from_status(StatusCode::NOT_FOUND, "");
        assert_eq!(err.message(), "Not Found");
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with("(truncated, 520 total bytes)"));

        // Multi-byte characters straddling the limit must not panic
        let wide = "é".repeat(MAX_ERROR_BODY_LENGTH);
        assert!(ApiError::truncate_body(&wide).contains("truncated"));
    }

    #[test]
    fn test_session_expired_message() {
        let err = ApiError::SessionExpired;
        assert_eq!(err.to_string(), "Your login has expired.");
        assert_eq!(err.message(), "Your login has expired.");
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert!(err.is_session_expired());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(!ApiError::from_status(StatusCode::FORBIDDEN, "").is_unauthorized());
    }
}
