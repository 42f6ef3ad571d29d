//! Reacts to provider events on behalf of the session manager.

use clinic_api::ClinicApi;
use tokio::sync::mpsc;

use crate::{AuthEvent, AuthEventBus, IdentityProvider, SessionManager, Subscription};

/// A transient, user-facing message ("toast").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub(crate) const SIGNED_IN_NOTICE: &str = "Signed in successfully.";
pub(crate) const REDIRECT_FAILURE_NOTICE: &str = "Social sign-in failed.";

/// Wires `manager` to the provider's events:
///
/// | Event | Reaction |
/// |---|---|
/// | `SignedIn` | success notice, wait for tokens, forced profile load |
/// | `SignInWithRedirectFailure` | error notice |
/// | `TokenRefreshFailure` | forced sign-out |
/// | `SignedOut` | drop the cached verdict |
///
/// Notices go to `notices`; a closed receiver is ignored. Events are
/// handled one at a time, in order. Drop the returned [`Subscription`] to
/// detach.
pub fn attach_listener<P, A>(
    manager: SessionManager<P, A>,
    bus: &AuthEventBus,
    notices: mpsc::UnboundedSender<Notice>,
) -> Subscription
where
    P: IdentityProvider,
    A: ClinicApi,
{
    bus.listen(move |event| {
        let manager = manager.clone();
        let notices = notices.clone();
        async move { handle_event(&manager, &notices, event).await }
    })
}

async fn handle_event<P, A>(
    manager: &SessionManager<P, A>,
    notices: &mpsc::UnboundedSender<Notice>,
    event: AuthEvent,
) where
    P: IdentityProvider,
    A: ClinicApi,
{
    tracing::debug!(event = event.name(), "handling auth event");
    match event {
        AuthEvent::SignedIn => {
            let _ = notices.send(Notice::success(SIGNED_IN_NOTICE));
            if manager.wait_for_tokens().await {
                manager.handle_get_profile(true).await;
            } else {
                tracing::warn!("signed in but tokens never arrived");
            }
        }
        AuthEvent::SignInWithRedirectFailure { reason } => {
            tracing::warn!(%reason, "social sign-in failed");
            let _ = notices.send(Notice::error(REDIRECT_FAILURE_NOTICE));
        }
        AuthEvent::TokenRefreshFailure => {
            tracing::warn!("token refresh failed, signing out");
            manager.force_sign_out().await;
        }
        AuthEvent::SignedOut => manager.invalidate_session_cache(),
        AuthEvent::TokenRefresh => {}
    }
}
