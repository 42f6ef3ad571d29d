//! Backend contract for the clinic dashboard.
//!
//! This crate defines everything the dashboard exchanges with its REST
//! backend:
//!
//! - **Types** ([`UserProfile`], [`Patient`], [`Appointment`],
//!   [`RecordingDetails`], [`ApiResponse`], …): the JSON bodies that
//!   travel on the wire.
//! - **Traits** ([`ClinicApi`], [`TokenSource`]): the seams the session
//!   layer depends on, so it can be driven by a mock in tests.
//! - **Client** ([`ApiClient`]): the `reqwest` implementation of those
//!   seams, plus the paginated list and audio upload endpoints.
//! - **Errors** ([`ApiError`]).
//!
//! # Architecture
//!
//! ```text
//! Session (auth lifecycle) → Api (typed requests) → HTTP (reqwest)
//! ```
//!
//! The API layer knows nothing about caching, retries or sign-out. A
//! response is reported as-is (status + optional body) and the session
//! layer decides what a 401 means.

#![allow(async_fn_in_trait)]

mod api;
mod client;
mod config;
mod error;
mod query;
mod types;
mod upload;

pub use api::{ClinicApi, TokenSource};
pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::ApiError;
pub use query::{
    AppointmentQuery, PageQuery, PatientQuery, RecordingQuery, SortDirection,
};
pub use types::{
    ApiResponse, Appointment, Page, Patient, ProfileBody, RecordingDetails,
    RecordingKind, RecordingQuota, RecordingSpeaker, RecordingSpeech,
    TranscriptionStatus, UserProfile,
};
pub use upload::{format_duration, NewRecording};
