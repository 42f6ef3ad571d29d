//! # Clinic
//!
//! Session-aware backend access for the clinic dashboard.
//!
//! The dashboard authenticates clinicians against a hosted identity
//! provider and then talks to its REST backend on their behalf. This crate
//! wires the two layers together: plug in an [`IdentityProvider`], point the
//! [`Dashboard`] at the backend, and read the session through
//! [`SessionManager::subscribe`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clinic::prelude::*;
//!
//! // Implement IdentityProvider for your provider SDK, then:
//! // let mut dashboard = Dashboard::builder()
//! //     .api_config(ApiConfig::from_env()?)
//! //     .build(my_provider)?;
//! // let notices = dashboard.start();
//! // dashboard.sign_in(&LoginForm::new("dr@clinic.com", "secret1")).await?;
//! ```

mod dashboard;
mod error;
pub mod logging;

pub use dashboard::{Backend, Dashboard, DashboardBuilder, RecordingDraft};
pub use error::ClinicError;

pub use clinic_api::{
    ApiClient, ApiConfig, ApiError, ApiResponse, Appointment, AppointmentQuery,
    Page, PageQuery, Patient, PatientQuery, RecordingDetails, RecordingKind,
    RecordingQuery, RecordingQuota, SortDirection, UserProfile,
};
pub use clinic_session::{
    AuthEvent, AuthEventBus, IdentityError, IdentityProvider, LoginForm, Notice,
    NoticeLevel, SessionConfig, SessionError, SessionManager, SessionSnapshot,
    SessionState, SocialProvider,
};

pub mod prelude {
    pub use crate::{
        ApiConfig, AuthEvent, ClinicError, Dashboard, IdentityProvider, LoginForm,
        Notice, NoticeLevel, SessionConfig, SessionSnapshot, SessionState,
        SocialProvider, UserProfile,
    };
    pub use clinic_session::{
        Credentials, Identity, SignInOutcome, SignOutOptions, TokenSet,
    };
}
