//! Error types for the API layer.
//!
//! A non-200 status is NOT an error here: it comes back as an
//! [`ApiResponse`](crate::ApiResponse) so the caller can branch on it.
//! `ApiError` is reserved for requests that never produced a usable
//! response, plus the few endpoints (upload, save) whose contract turns a
//! bad status into a failure.

/// Errors that can occur while talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the response could not be read
    /// (DNS, TLS, connection reset, …).
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// A 200 response carried a body that doesn't match the expected type.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The endpoint contract requires success but the backend answered
    /// with this status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The upload succeeded but the body had neither `url` nor `audioUrl`.
    #[error("upload response did not include an audio URL")]
    MissingUploadUrl,

    /// The configured base URL (or a path joined onto it) is not a URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Returns `true` if this error means the caller is not authorized.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Status(status) => *status == 401,
            Self::Transport(err) => {
                err.status().is_some_and(|s| s.as_u16() == 401)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_unauthorized_status_401_returns_true() {
        assert!(ApiError::Status(401).is_unauthorized());
    }

    #[test]
    fn test_is_unauthorized_other_errors_return_false() {
        assert!(!ApiError::Status(500).is_unauthorized());
        assert!(!ApiError::MissingUploadUrl.is_unauthorized());
        assert!(!ApiError::InvalidUrl("x".into()).is_unauthorized());
    }

    #[test]
    fn test_display_includes_status() {
        assert_eq!(ApiError::Status(503).to_string(), "unexpected status 503");
    }
}
