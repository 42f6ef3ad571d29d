//! Observable session state.
//!
//! Everything a presentation layer needs to render the signed-in user:
//! the lifecycle state, the profile, the loading flag and the recording
//! quota. The manager publishes a fresh [`SessionSnapshot`] through a
//! `tokio::sync::watch` channel whenever one of them changes.

use std::fmt;

use clinic_api::{RecordingQuota, UserProfile};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where the manager is in the authentication lifecycle.
///
/// ```text
///   Uninitialized ──(check)──→ Checking ──→ Authenticated
///                                 ↑  │             │
///                                 │  └──→ Unauthenticated ←──┘
///                                 │             │   (sign-out, refresh
///                                 └─────────────┘    failure, 401)
///                          (login, forced refresh)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No check has run yet.
    #[default]
    Uninitialized,

    /// A session check is in flight and nothing has been decided yet.
    Checking,

    /// The last check found tokens and an identity.
    Authenticated,

    /// The last check failed, or the user was signed out.
    Unauthenticated,
}

impl SessionState {
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// Whether entering `Checking` from here is a visible transition.
    ///
    /// Re-checks of an authenticated session happen silently so the UI
    /// doesn't flicker every time the cache expires.
    pub(crate) fn shows_checking(self) -> bool {
        matches!(self, Self::Uninitialized | Self::Unauthenticated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Checking => write!(f, "checking"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// A consistent view of the session at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,

    /// The signed-in user's profile. Replaced wholesale on each successful
    /// fetch, `None` after sign-out or a failed check.
    pub profile: Option<UserProfile>,

    /// `true` from construction until initialization settles, and while a
    /// profile fetch is running.
    pub loading: bool,

    pub available_recording: u32,
    pub total_recording: u32,
}

impl SessionSnapshot {
    pub fn quota(&self) -> RecordingQuota {
        RecordingQuota {
            available: self.available_recording,
            total: self.total_recording,
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::Uninitialized,
            profile: None,
            loading: true,
            available_recording: 0,
            total_recording: 0,
        }
    }
}
