//! Recording upload payloads.

use serde::{Deserialize, Serialize};

use crate::RecordingKind;

/// Fallback name when the clinician leaves the name blank.
pub const DEFAULT_RECORDING_NAME: &str = "Session notes";
/// Fallback description when the clinician leaves it blank.
pub const DEFAULT_RECORDING_DESCRIPTION: &str = "Audio summary";

/// Body of `POST /recording`, sent after the audio itself was uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecording {
    pub name: String,
    pub description: String,
    /// Human-readable duration, see [`format_duration`].
    pub duration: String,
    pub seconds: u64,
    pub audio_url: String,
    #[serde(rename = "type")]
    pub kind: RecordingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl NewRecording {
    /// Builds the payload, trimming the free-text fields and substituting
    /// defaults for blank ones. An empty `client_id` is dropped.
    pub fn new(
        name: &str,
        description: &str,
        seconds: u64,
        audio_url: String,
        kind: RecordingKind,
        client_id: Option<String>,
    ) -> Self {
        Self {
            name: non_blank(name, DEFAULT_RECORDING_NAME),
            description: non_blank(description, DEFAULT_RECORDING_DESCRIPTION),
            duration: format_duration(seconds),
            seconds,
            audio_url,
            kind,
            client_id: client_id.filter(|id| !id.is_empty()),
        }
    }
}

fn non_blank(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Formats a recording length: `42s` under a minute, `3m 5s` above.
pub fn format_duration(seconds: u64) -> String {
    let mins = seconds / 60;
    let secs = seconds % 60;
    if mins == 0 {
        format!("{secs}s")
    } else {
        format!("{mins}m {secs}s")
    }
}

/// Body of `POST /convert`. Older deployments answer with `audioUrl`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadBody {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    audio_url: Option<String>,
}

impl UploadBody {
    pub(crate) fn into_url(self) -> Option<String> {
        self.url
            .filter(|u| !u.is_empty())
            .or(self.audio_url.filter(|u| !u.is_empty()))
    }
}
