//! `Dashboard` builder: one place that wires identity, backend and session.
//!
//! ```text
//!   IdentityProvider ──→ ProviderTokens ──→ ApiClient (bearer auth)
//!          │                                    │
//!          ├──→ LoginFlow                       │
//!          └──→ SessionManager ←────────────────┘
//!                     ↑
//!   AuthEventBus ──→ listener ──→ notices
//! ```

use std::sync::Arc;

use clinic_api::{
    ApiClient, ApiConfig, NewRecording, RecordingKind,
};
use clinic_session::{
    attach_listener, AuthEvent, AuthEventBus, IdentityProvider, LoginFlow, LoginForm,
    Notice, ProviderTokens, SessionConfig, SessionManager, SocialProvider, Subscription,
};
use tokio::sync::mpsc;

use crate::ClinicError;

/// The HTTP backend, authenticated with the provider's access token.
pub type Backend<P> = ApiClient<ProviderTokens<P>>;

/// Builder for configuring a [`Dashboard`].
///
/// # Example
///
/// ```rust,ignore
/// use clinic::prelude::*;
///
/// let dashboard = Dashboard::builder()
///     .base_url("https://api.clinic.example")
///     .build(my_provider)?;
/// ```
pub struct DashboardBuilder {
    api_config: ApiConfig,
    session_config: SessionConfig,
}

impl DashboardBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            api_config: ApiConfig::default(),
            session_config: SessionConfig::default(),
        }
    }

    /// Sets the backend base URL, keeping the other API settings.
    pub fn base_url(mut self, base_url: &str) -> Self {
        let ApiConfig {
            connect_timeout,
            request_timeout,
            ..
        } = self.api_config;
        self.api_config = ApiConfig {
            connect_timeout,
            request_timeout,
            ..ApiConfig::with_base_url(base_url)
        };
        self
    }

    pub fn api_config(mut self, config: ApiConfig) -> Self {
        self.api_config = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Builds the dashboard around `provider`. Nothing runs until
    /// [`Dashboard::start`].
    ///
    /// # Errors
    /// [`ClinicError::Api`] when the API configuration is invalid.
    pub fn build<P: IdentityProvider>(self, provider: P) -> Result<Dashboard<P>, ClinicError> {
        let provider = Arc::new(provider);
        let backend = Arc::new(ApiClient::new(
            self.api_config,
            ProviderTokens::new(Arc::clone(&provider)),
        )?);
        let session = SessionManager::new(
            Arc::clone(&provider),
            Arc::clone(&backend),
            self.session_config,
        );

        tracing::info!(base_url = backend.base_url(), "dashboard configured");
        Ok(Dashboard {
            login: LoginFlow::new(Arc::clone(&provider)),
            provider,
            backend,
            session,
            events: Arc::new(AuthEventBus::new()),
            listener: None,
        })
    }
}

impl Default for DashboardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// What the clinician recorded, before it is uploaded.
#[derive(Debug, Clone)]
pub struct RecordingDraft {
    /// Encoded audio (MP3).
    pub audio: Vec<u8>,
    pub name: String,
    pub description: String,
    pub seconds: u64,
    pub kind: RecordingKind,
    /// Patient the recording belongs to, if any.
    pub client_id: Option<String>,
}

/// The signed-in dashboard: session state plus authenticated backend access.
pub struct Dashboard<P: IdentityProvider> {
    provider: Arc<P>,
    backend: Arc<Backend<P>>,
    session: SessionManager<P, Backend<P>>,
    events: Arc<AuthEventBus>,
    login: LoginFlow<P>,
    listener: Option<Subscription>,
}

impl<P: IdentityProvider> Dashboard<P> {
    /// Creates a new builder.
    pub fn builder() -> DashboardBuilder {
        DashboardBuilder::new()
    }

    /// Attaches the auth event listener and schedules session
    /// initialization. Returns the stream of user-facing notices.
    ///
    /// Calling it again replaces the previous listener and notice stream.
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> mpsc::UnboundedReceiver<Notice> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listener = Some(attach_listener(self.session.clone(), &self.events, tx));
        self.session.start();
        rx
    }

    /// Detaches the listener and disposes the session manager.
    pub async fn shutdown(mut self) {
        if let Some(listener) = self.listener.take() {
            listener.unsubscribe().await;
        }
        self.session.dispose();
        tracing::info!("dashboard shut down");
    }

    /// Signs in with email and password and announces it on the event
    /// bus, which loads the profile.
    ///
    /// This is the only [`AuthEvent::SignedIn`] for a credential sign-in.
    /// Provider glue feeding [`events`](Self::events) must forward
    /// `SignedIn` for redirect sign-ins only, or the profile loads twice.
    ///
    /// # Errors
    /// [`ClinicError::Session`] for invalid input, rejected credentials
    /// or an incomplete sign-in.
    pub async fn sign_in(&self, form: &LoginForm) -> Result<(), ClinicError> {
        self.login.sign_in(form).await?;
        self.events.emit(AuthEvent::SignedIn);
        Ok(())
    }

    /// Starts a social sign-in. Completion arrives later as an event.
    pub async fn sign_in_with_redirect(&self, provider: SocialProvider) -> Result<(), ClinicError> {
        self.login.sign_in_with_redirect(provider).await?;
        Ok(())
    }

    /// Signs out everywhere and clears the session.
    pub async fn sign_out(&self) {
        self.session.force_sign_out().await;
        self.events.emit(AuthEvent::SignedOut);
    }

    /// Uploads the audio, stores the recording and refreshes the quota.
    ///
    /// # Errors
    /// [`ClinicError::Api`] when the upload or the save fails; nothing is
    /// stored if the upload failed.
    pub async fn save_recording(&self, draft: RecordingDraft) -> Result<(), ClinicError> {
        let RecordingDraft {
            audio,
            name,
            description,
            seconds,
            kind,
            client_id,
        } = draft;

        let audio_url = self.backend.upload_audio(audio).await?;
        let recording = NewRecording::new(&name, &description, seconds, audio_url, kind, client_id);
        self.backend.save_recording(&recording).await?;

        self.session.handle_get_available_recording().await;
        Ok(())
    }

    pub fn session(&self) -> &SessionManager<P, Backend<P>> {
        &self.session
    }

    pub fn backend(&self) -> &Backend<P> {
        &self.backend
    }

    /// The bus provider glue forwards SDK events into. Credential
    /// sign-ins are announced by [`sign_in`](Self::sign_in) itself.
    pub fn events(&self) -> &Arc<AuthEventBus> {
        &self.events
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }
}
