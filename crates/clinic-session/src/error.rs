//! Error types for the session layer.
//!
//! The four session operations (`check_session`, `handle_get_profile`,
//! `force_sign_out`, `wait_for_tokens`) never return these: failures there
//! become state transitions. They surface only from the login flow and
//! from identity-provider implementations.

/// Errors reported by an [`IdentityProvider`](crate::IdentityProvider).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// There is no signed-in user (no tokens, no identity).
    #[error("no signed-in user")]
    NotSignedIn,

    /// The username doesn't exist in the user pool.
    #[error("user not found")]
    UserNotFound,

    /// Wrong credentials, or the refresh token was revoked.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The provider could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// Anything else the provider reported.
    #[error("identity provider error: {0}")]
    Provider(String),
}

impl IdentityError {
    /// The message shown to the clinician in a notice.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UserNotFound => "User not found.",
            Self::NotAuthorized(_) => "Incorrect email or password.",
            Self::Network(_) => "Network error. Check your connection.",
            Self::NotSignedIn | Self::Provider(_) => {
                "Could not sign in, please try again."
            }
        }
    }
}

/// Errors from the login flow.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The login form didn't pass validation. The message is user-facing.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The identity provider rejected the request.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The provider accepted the credentials but asked for another step
    /// (MFA, new password, …) that the dashboard doesn't support.
    #[error("sign-in did not complete")]
    SignInIncomplete,

    /// A backend call made on behalf of the session failed.
    #[error(transparent)]
    Api(#[from] clinic_api::ApiError),
}

impl SessionError {
    /// The message shown to the clinician in a notice.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Identity(err) => err.user_message().to_string(),
            Self::SignInIncomplete => {
                "Could not complete sign-in. Please try again.".to_string()
            }
            Self::Api(_) => "Could not reach the server, please try again.".to_string(),
        }
    }
}
