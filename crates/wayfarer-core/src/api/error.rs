use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Duplicate request cancelled: {0}")]
    DuplicateRequest(String),

    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("Access denied")]
    Forbidden,

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("{message}")]
    RequestFailed { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Login response is missing the {0} field")]
    MalformedLoginResponse(&'static str),

    #[error("Could not save login state: {0}")]
    StorageWriteFailure(String),

    #[error("Please log in first")]
    NotAuthenticated,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

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

    /// Generic message used when the server did not send a usable `message`.
    pub fn fallback_message(status: u16) -> String {
        match status {
            404 => "The requested resource does not exist".to_string(),
            _ => format!("Request failed: {}", status),
        }
    }

    /// Classify a non-success status. `body` is the raw response text; a JSON
    /// `{"message": ...}` envelope is preferred over the generic fallback.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => ApiError::SessionExpired,
            403 => ApiError::Forbidden,
            429 => ApiError::RateLimited,
            _ => {
                let message = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.get("message")
                            .and_then(|m| m.as_str())
                            .filter(|m| !m.is_empty())
                            .map(Self::truncate_body)
                    })
                    .unwrap_or_else(|| Self::fallback_message(status));
                ApiError::RequestFailed { status, message }
            }
        }
    }

    /// Timeouts and explicit aborts. These are never retried.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ApiError::Timeout(_) | ApiError::Cancelled)
    }

    /// Everything except cancellations and rejected duplicates is retried,
    /// including a 401.
    pub fn is_retryable(&self) -> bool {
        !self.is_cancellation() && !matches!(self, ApiError::DuplicateRequest(_))
    }

    /// The backend rejected our credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ApiError::SessionExpired | ApiError::RequestFailed { status: 401, .. }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::SessionExpired => Some(401),
            ApiError::Forbidden => Some(403),
            ApiError::RateLimited => Some(429),
            ApiError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_special_cases() {
        assert!(matches!(ApiError::from_status(401, ""), ApiError::SessionExpired));
        assert!(matches!(ApiError::from_status(403, "{}"), ApiError::Forbidden));
        assert!(matches!(ApiError::from_status(429, ""), ApiError::RateLimited));
    }

    #[test]
    fn test_from_status_uses_message_body() {
        let err = ApiError::from_status(400, r#"{"message":"username taken"}"#);
        match err {
            ApiError::RequestFailed { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "username taken");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_from_status_fallback_messages() {
        let err = ApiError::from_status(500, "<html>oops</html>");
        assert_eq!(err.to_string(), "Request failed: 500");

        let err = ApiError::from_status(404, "");
        assert_eq!(err.to_string(), "The requested resource does not exist");
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "景".repeat(400);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_retry_classification() {
        assert!(!ApiError::Timeout(10).is_retryable());
        assert!(!ApiError::Cancelled.is_retryable());
        assert!(!ApiError::DuplicateRequest("k".into()).is_retryable());
        assert!(ApiError::Network("reset".into()).is_retryable());
        assert!(ApiError::RateLimited.is_retryable());
        assert!(ApiError::RequestFailed { status: 500, message: "x".into() }.is_retryable());
        assert!(ApiError::SessionExpired.is_retryable());
    }

    #[test]
    fn test_auth_error_detection() {
        assert!(ApiError::SessionExpired.is_auth_error());
        assert!(ApiError::RequestFailed { status: 401, message: String::new() }.is_auth_error());
        assert!(!ApiError::Forbidden.is_auth_error());
    }
}
