//! The backend seams the session layer depends on.
//!
//! The session manager never talks HTTP directly. It asks a [`ClinicApi`]
//! for the profile and the recording quota, and the HTTP client asks a
//! [`TokenSource`] for the bearer token. Both are traits so that tests can
//! swap in scripted fakes and production can use [`ApiClient`](crate::ApiClient).

use std::future::Future;

use crate::{ApiError, ApiResponse, ProfileBody, RecordingQuota};

/// Supplies the bearer token for authenticated requests.
///
/// Implemented by the session layer on top of the identity provider.
/// Returning `None` sends the request without an `Authorization` header;
/// the backend will answer 401 and the caller handles it from there.
pub trait TokenSource: Send + Sync + 'static {
    fn access_token(&self) -> impl Future<Output = Option<String>> + Send;
}

/// The subset of the backend the session manager consumes.
///
/// # Example
///
/// ```rust
/// use clinic_api::{ApiError, ApiResponse, ClinicApi, ProfileBody, RecordingQuota, UserProfile};
///
/// /// Always answers with the same clinician.
/// struct FixedApi(UserProfile);
///
/// impl ClinicApi for FixedApi {
///     async fn get_profile(&self) -> Result<ApiResponse<ProfileBody>, ApiError> {
///         Ok(ApiResponse::ok(ProfileBody { profile: self.0.clone() }))
///     }
///
///     async fn get_available_recording(
///         &self,
///     ) -> Result<ApiResponse<RecordingQuota>, ApiError> {
///         Ok(ApiResponse::ok(RecordingQuota { available: 3, total: 10 }))
///     }
/// }
/// ```
pub trait ClinicApi: Send + Sync + 'static {
    /// `GET /user`
    fn get_profile(
        &self,
    ) -> impl Future<Output = Result<ApiResponse<ProfileBody>, ApiError>> + Send;

    /// `GET /signature/available-recording`
    fn get_available_recording(
        &self,
    ) -> impl Future<Output = Result<ApiResponse<RecordingQuota>, ApiError>> + Send;
}
