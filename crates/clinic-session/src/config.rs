//! Session timing configuration.

use std::time::Duration;

use tracing::warn;

/// Timing knobs for the session manager.
///
/// The defaults match what the dashboard has been running with; tests
/// usually keep them and drive time with `tokio::time::pause()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a session verdict is reused without asking the provider.
    pub cache_ttl: Duration,
    /// How long a finished session check stays joinable, so callers that
    /// arrive right after it resolves reuse its result.
    pub check_linger: Duration,
    /// Attempts made by `wait_for_tokens` before giving up.
    pub token_poll_attempts: u32,
    /// Delay between two `wait_for_tokens` attempts.
    pub token_poll_interval: Duration,
    /// Retries allowed per profile fetch after a 401.
    pub profile_retry_limit: u32,
    /// Pause between a forced token refresh and the profile retry.
    pub refresh_retry_delay: Duration,
    /// Pause after sign-out so the provider's local state settles.
    pub sign_out_settle: Duration,
    /// Delay before the first session check after `start()`.
    pub init_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(2),
            check_linger: Duration::from_millis(100),
            token_poll_attempts: 10,
            token_poll_interval: Duration::from_millis(300),
            profile_retry_limit: 1,
            refresh_retry_delay: Duration::from_millis(500),
            sign_out_settle: Duration::from_millis(300),
            init_delay: Duration::from_millis(100),
        }
    }
}

impl SessionConfig {
    /// Upper bound on retries after a 401. Anything higher risks a refresh
    /// loop against a backend that keeps rejecting the token.
    pub const MAX_PROFILE_RETRIES: u32 = 3;

    /// Fix out-of-range values so the config is safe to use.
    ///
    /// Called by [`SessionManager::new`](crate::SessionManager::new):
    /// - `token_poll_attempts` is at least 1.
    /// - `profile_retry_limit` is capped to [`Self::MAX_PROFILE_RETRIES`].
    /// - `check_linger` is at most `cache_ttl`, so a finished check is
    ///   never joined after its verdict expired.
    pub fn validated(mut self) -> Self {
        if self.token_poll_attempts == 0 {
            warn!("token_poll_attempts is 0, using 1");
            self.token_poll_attempts = 1;
        }
        if self.profile_retry_limit > Self::MAX_PROFILE_RETRIES {
            warn!(
                limit = self.profile_retry_limit,
                max = Self::MAX_PROFILE_RETRIES,
                "profile_retry_limit exceeds maximum, clamping"
            );
            self.profile_retry_limit = Self::MAX_PROFILE_RETRIES;
        }
        if self.check_linger > self.cache_ttl {
            warn!(
                linger_ms = self.check_linger.as_millis() as u64,
                ttl_ms = self.cache_ttl.as_millis() as u64,
                "check_linger exceeds cache_ttl, clamping"
            );
            self.check_linger = self.cache_ttl;
        }
        self
    }
}
