//! Unified error type for the clinic crates.

use clinic_api::ApiError;
use clinic_session::{IdentityError, SessionError};

/// Top-level error that wraps all crate-specific errors.
///
/// Lets callers of [`Dashboard`](crate::Dashboard) handle one type; the
/// `#[from]` attributes let `?` convert the layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    /// A backend request failed (transport, decode, status, config).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The login flow failed (validation, rejected credentials).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The identity provider failed outside the login flow.
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl ClinicError {
    /// The message shown to the clinician in a notice.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(ApiError::MissingUploadUrl) => {
                "The upload did not return an audio URL.".to_string()
            }
            Self::Api(_) => "Could not reach the server, please try again.".to_string(),
            Self::Session(err) => err.user_message(),
            Self::Identity(err) => err.user_message().to_string(),
        }
    }
}
