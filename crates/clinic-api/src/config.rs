//! Backend client configuration.

use std::time::Duration;

use crate::ApiError;

/// Used when `CLINIC_API_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3333";

/// Where the backend lives and how long to wait for it.
///
/// No timeouts are set by default: the session layer bounds its own
/// waiting through retry counts, not per-request deadlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL without a trailing slash, e.g. `https://api.example.com`.
    pub base_url: String,
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: None,
            request_timeout: None,
        }
    }
}

impl ApiConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Build the config from environment variables.
    ///
    /// - `CLINIC_API_URL`: base URL (default [`DEFAULT_BASE_URL`])
    /// - `CLINIC_API_CONNECT_TIMEOUT_SECS`: optional
    /// - `CLINIC_API_REQUEST_TIMEOUT_SECS`: optional
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = std::env::var("CLINIC_API_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let config = Self {
            connect_timeout: env_secs("CLINIC_API_CONNECT_TIMEOUT_SECS"),
            request_timeout: env_secs("CLINIC_API_REQUEST_TIMEOUT_SECS"),
            ..Self::with_base_url(base_url)
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that `base_url` is an absolute http(s) URL.
    pub fn validate(&self) -> Result<(), ApiError> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ApiError::InvalidUrl(format!(
                "{}: unsupported scheme {other}",
                self.base_url
            ))),
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}
