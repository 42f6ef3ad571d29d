//! Authentication events from the identity provider.
//!
//! The provider SDK reports sign-ins, redirects and token refreshes
//! asynchronously. The glue code forwards them into an [`AuthEventBus`];
//! anything interested subscribes with [`AuthEventBus::listen`] and gets a
//! [`Subscription`] that stops listening when dropped.

use std::future::Future;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Events beyond this many unread ones make slow listeners skip ahead.
const DEFAULT_CAPACITY: usize = 64;

/// Something that happened at the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    /// A hosted-UI (social) sign-in came back with an error.
    SignInWithRedirectFailure { reason: String },
    TokenRefresh,
    /// The refresh token was rejected; the session can't be recovered.
    TokenRefreshFailure,
}

impl AuthEvent {
    /// Stable name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SignedIn => "signedIn",
            Self::SignedOut => "signedOut",
            Self::SignInWithRedirectFailure { .. } => "signInWithRedirect_failure",
            Self::TokenRefresh => "tokenRefresh",
            Self::TokenRefreshFailure => "tokenRefresh_failure",
        }
    }
}

/// Broadcasts [`AuthEvent`]s to every current listener.
///
/// Uses a Tokio broadcast channel: listeners only see events emitted after
/// they subscribed.
pub struct AuthEventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Sends `event` to all listeners. Returns how many received it; with
    /// no listeners the event is dropped.
    pub fn emit(&self, event: AuthEvent) -> usize {
        tracing::debug!(event = event.name(), "auth event");
        self.sender.send(event).unwrap_or(0)
    }

    /// Raw receiver for callers that want to drive the loop themselves.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Runs `handler` for every event, one at a time, on a spawned task.
    ///
    /// The listener is registered before this returns, so no event emitted
    /// afterwards is missed. Must be called from within a Tokio runtime.
    pub fn listen<F, Fut>(&self, mut handler: F) -> Subscription
    where
        F: FnMut(AuthEvent) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut rx = self.sender.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => handler(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "auth listener lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription {
            handle: Some(handle),
        }
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A live listener. Dropping it stops the listener task.
#[must_use = "dropping a Subscription stops the listener"]
pub struct Subscription {
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stops the listener and waits until its task is gone, so no handler
    /// runs after this returns.
    pub async fn unsubscribe(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }

    /// `false` once the bus was dropped and the listener ended.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
