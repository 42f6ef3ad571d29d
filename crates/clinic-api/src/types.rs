//! Wire types for the clinic backend.
//!
//! Field names follow the backend's JSON (camelCase). Dates are kept as
//! the strings the backend sends; nothing in the dashboard does date math
//! on them.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// A backend response: the HTTP status plus the decoded body, if any.
///
/// `body` is always `Some` on a 200. On other statuses the backend may
/// send an error document, plain text, or nothing at all, so the body is
/// decoded opportunistically and left `None` when it doesn't fit `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub body: Option<T>,
}

impl<T> ApiResponse<T> {
    /// A 200 response carrying `body`.
    pub fn ok(body: T) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    /// A response with the given status and no body.
    pub fn status(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Returns the body of a 200 response, `None` otherwise.
    pub fn into_ok_body(self) -> Option<T> {
        if self.is_ok() { self.body } else { None }
    }

    /// Converts the body, keeping the status.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            status: self.status,
            body: self.body.map(f),
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// The signed-in clinician, as returned by `GET /user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf_cnpj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
}

/// Body of `GET /user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBody {
    pub profile: UserProfile,
}

/// Body of `GET /signature/available-recording`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct RecordingQuota {
    pub available: u32,
    pub total: u32,
}

// ---------------------------------------------------------------------------
// Listed entities
// ---------------------------------------------------------------------------

/// A patient. The backend still calls these "clients".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub user_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    pub created_at: String,
}

/// An appointment. The backend still calls these "reminders".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub name: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub user_id: String,
    /// Spelling matches the backend field.
    #[serde(default)]
    pub notification_sended: bool,
}

/// Where a recording was made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingKind {
    /// Attached to a patient.
    #[default]
    Client,
    /// Attached to an appointment.
    Reminder,
    Study,
    Other,
}

impl RecordingKind {
    /// The value used on the wire and in query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "CLIENT",
            Self::Reminder => "REMINDER",
            Self::Study => "STUDY",
            Self::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranscriptionStatus {
    NotRequested,
    Pending,
    Transcribing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSpeaker {
    pub id: String,
    pub name: String,
    pub recording_id: String,
}

/// One diarized utterance of a transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSpeech {
    pub speaker_id: String,
    pub transcription: String,
    pub recording_id: String,
    pub start_time: f64,
    pub end_time: f64,
}

/// A stored voice recording with its transcription state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingDetails {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration: String,
    pub audio_url: String,
    pub user_id: String,
    pub transcription_status: TranscriptionStatus,
    #[serde(rename = "type")]
    pub kind: RecordingKind,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub client: Option<Patient>,
    #[serde(default)]
    pub reminder_id: Option<String>,
    #[serde(default)]
    pub transcription_id: Option<String>,
    #[serde(default)]
    pub speeches: Vec<RecordingSpeech>,
    #[serde(default)]
    pub speakers: Vec<RecordingSpeaker>,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// One page of a list endpoint, with the total page count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pages: u32,
}

// The list endpoints name their item arrays after the backend entity.
// These raw shapes are decoded first and then flattened into `Page<T>`.

#[derive(Deserialize)]
pub(crate) struct ClientsBody {
    #[serde(default)]
    clients: Vec<Patient>,
    #[serde(default)]
    pages: u32,
}

impl From<ClientsBody> for Page<Patient> {
    fn from(body: ClientsBody) -> Self {
        Self {
            items: body.clients,
            pages: body.pages,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct RemindersBody {
    #[serde(default)]
    reminders: Vec<Appointment>,
    #[serde(default)]
    pages: u32,
}

impl From<RemindersBody> for Page<Appointment> {
    fn from(body: RemindersBody) -> Self {
        Self {
            items: body.reminders,
            pages: body.pages,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct RecordingsBody {
    #[serde(default)]
    recordings: Vec<RecordingDetails>,
    #[serde(default)]
    pages: u32,
}

impl From<RecordingsBody> for Page<RecordingDetails> {
    fn from(body: RecordingsBody) -> Self {
        Self {
            items: body.recordings,
            pages: body.pages,
        }
    }
}
