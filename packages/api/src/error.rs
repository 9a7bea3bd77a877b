//! Error type shared by every remote operation.

use std::time::Duration;

/// Failure of a call against the remote service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The auth service rejected the request (bad credentials, duplicate account, ...).
    #[error("{message}")]
    Auth { status: u16, message: String },

    /// The table or storage service rejected the request.
    #[error("request failed ({status}): {message}")]
    Request { status: u16, message: String },

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether the failure is transient and a read may be issued again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Http(_) | ApiError::Timeout(_))
    }

    /// Whether the remote service rejected the call, as opposed to the call never completing.
    pub fn is_remote_rejection(&self) -> bool {
        matches!(self, ApiError::Auth { .. } | ApiError::Request { .. })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_displays_bare_message() {
        let err = ApiError::Auth {
            status: 400,
            message: "Invalid login credentials".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert!(err.is_remote_rejection());
        assert!(!err.is_retryable());
    }

    #[test]
    fn timeout_is_retryable() {
        let err = ApiError::Timeout(Duration::from_secs(15));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "request timed out after 15s");
    }
}
