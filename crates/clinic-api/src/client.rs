//! `reqwest` implementation of the backend contract.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{ClientsBody, RecordingsBody, RemindersBody};
use crate::upload::UploadBody;
use crate::{
    ApiConfig, ApiError, ApiResponse, Appointment, AppointmentQuery, ClinicApi,
    NewRecording, Page, Patient, PatientQuery, ProfileBody, RecordingDetails,
    RecordingQuery, RecordingQuota, TokenSource,
};

/// HTTP client for the clinic backend.
///
/// Authenticated requests carry `Authorization: Bearer <token>` with the
/// token taken from `T` at request time, so a refreshed token is picked up
/// without rebuilding the client.
pub struct ApiClient<T> {
    http: reqwest::Client,
    base_url: String,
    tokens: T,
}

impl<T: TokenSource> ApiClient<T> {
    /// Builds a client from a validated config.
    ///
    /// # Errors
    /// [`ApiError::InvalidUrl`] for a bad base URL, [`ApiError::Transport`]
    /// if the TLS backend can't be initialized.
    pub fn new(config: ApiConfig, tokens: T) -> Result<Self, ApiError> {
        config.validate()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ApiError::Transport)?;

        Ok(Self {
            http,
            base_url: config.base_url,
            tokens,
        })
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /client`: one page of patients.
    pub async fn list_patients(
        &self,
        query: &PatientQuery,
    ) -> Result<ApiResponse<Page<Patient>>, ApiError> {
        let resp: ApiResponse<ClientsBody> =
            self.get("/client", &query.to_pairs(), true).await?;
        Ok(resp.map(Page::from))
    }

    /// `GET /reminder`: one page of appointments.
    pub async fn list_appointments(
        &self,
        query: &AppointmentQuery,
    ) -> Result<ApiResponse<Page<Appointment>>, ApiError> {
        let resp: ApiResponse<RemindersBody> =
            self.get("/reminder", &query.to_pairs(), true).await?;
        Ok(resp.map(Page::from))
    }

    /// `GET /recording`: one page of recordings.
    pub async fn list_recordings(
        &self,
        query: &RecordingQuery,
    ) -> Result<ApiResponse<Page<RecordingDetails>>, ApiError> {
        let resp: ApiResponse<RecordingsBody> =
            self.get("/recording", &query.to_pairs(), true).await?;
        Ok(resp.map(Page::from))
    }

    /// `POST /convert`: uploads an encoded audio clip and returns its URL.
    ///
    /// The endpoint is called without credentials.
    ///
    /// # Errors
    /// - [`ApiError::Status`]: the backend answered with status ≥ 400
    /// - [`ApiError::MissingUploadUrl`]: neither `url` nor `audioUrl` came back
    pub async fn upload_audio(&self, audio: Vec<u8>) -> Result<String, ApiError> {
        let part = reqwest::multipart::Part::bytes(audio)
            .file_name("audio.mp3")
            .mime_str("audio/mpeg")
            .map_err(ApiError::Transport)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.url("/convert", &[])?;
        let resp = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::Transport)?;
        let resp: ApiResponse<UploadBody> = read_response(resp).await?;

        if resp.status >= 400 {
            tracing::warn!(status = resp.status, "audio upload rejected");
            return Err(ApiError::Status(resp.status));
        }
        resp.body
            .and_then(UploadBody::into_url)
            .ok_or(ApiError::MissingUploadUrl)
    }

    /// `POST /recording`: stores the metadata of an uploaded recording.
    ///
    /// # Errors
    /// [`ApiError::Status`] for anything but a 200.
    pub async fn save_recording(
        &self,
        recording: &NewRecording,
    ) -> Result<(), ApiError> {
        let resp: ApiResponse<serde_json::Value> =
            self.post_json("/recording", recording, true).await?;
        if resp.is_ok() {
            tracing::info!(name = %recording.name, "recording saved");
            Ok(())
        } else {
            Err(ApiError::Status(resp.status))
        }
    }

    // -- Internals ---------------------------------------------------------

    async fn get<B: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
        authenticated: bool,
    ) -> Result<ApiResponse<B>, ApiError> {
        let url = self.url(path, query)?;
        let mut req = self.http.get(url);
        if authenticated {
            req = self.authorize(req).await;
        }
        let resp = req.send().await.map_err(ApiError::Transport)?;
        read_response(resp).await
    }

    async fn post_json<P: Serialize + ?Sized, B: DeserializeOwned>(
        &self,
        path: &str,
        payload: &P,
        authenticated: bool,
    ) -> Result<ApiResponse<B>, ApiError> {
        let url = self.url(path, &[])?;
        let mut req = self.http.post(url).json(payload);
        if authenticated {
            req = self.authorize(req).await;
        }
        let resp = req.send().await.map_err(ApiError::Transport)?;
        read_response(resp).await
    }

    async fn authorize(
        &self,
        req: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        match self.tokens.access_token().await {
            Some(token) => req.bearer_auth(token),
            None => {
                tracing::debug!("no access token available, sending request anonymously");
                req
            }
        }
    }

    fn url(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<reqwest::Url, ApiError> {
        let raw = format!("{}{}", self.base_url, path);
        let mut url = reqwest::Url::parse(&raw)
            .map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
        // Only touch the query when there is one, otherwise the URL ends in `?`.
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }
}

impl<T: TokenSource> ClinicApi for ApiClient<T> {
    async fn get_profile(&self) -> Result<ApiResponse<ProfileBody>, ApiError> {
        self.get("/user", &[], true).await
    }

    async fn get_available_recording(
        &self,
    ) -> Result<ApiResponse<RecordingQuota>, ApiError> {
        self.get("/signature/available-recording", &[], true).await
    }
}

/// Reads status and body. A 200 must decode as `B`; anything else is
/// decoded on a best-effort basis.
async fn read_response<B: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<ApiResponse<B>, ApiError> {
    let status = resp.status().as_u16();
    let bytes = resp.bytes().await.map_err(ApiError::Transport)?;
    decode_body(status, &bytes)
}

pub(crate) fn decode_body<B: DeserializeOwned>(
    status: u16,
    bytes: &[u8],
) -> Result<ApiResponse<B>, ApiError> {
    if status == 200 {
        let body = serde_json::from_slice(bytes).map_err(ApiError::Decode)?;
        return Ok(ApiResponse {
            status,
            body: Some(body),
        });
    }
    let body = serde_json::from_slice(bytes).ok();
    tracing::debug!(status, decoded = body.is_some(), "non-200 response");
    Ok(ApiResponse { status, body })
}
