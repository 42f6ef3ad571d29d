//! The session manager: owns the clinician's authentication lifecycle.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Deciding whether a valid session exists, and caching that verdict
//! - Coalescing concurrent checks and profile fetches
//! - Loading the profile and recording quota
//! - Recovering from one expired token, and signing out when that fails
//!
//! None of the public operations return errors. Every failure underneath
//! (provider, network, backend status) ends up as a state transition that
//! subscribers observe through [`SessionManager::subscribe`].
//!
//! # Concurrency
//!
//! `SessionManager` is a cheap handle around an `Arc`; clone it into every
//! task that needs it. Checks and profile fetches run as spawned flights
//! (see [`SingleFlight`]), so a caller that stops waiting never leaves the
//! manager with a half-finished operation registered.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use clinic_api::{ClinicApi, RecordingQuota, UserProfile};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{
    IdentityProvider, SessionConfig, SessionSnapshot, SessionState, SignOutOptions,
    SingleFlight, VerdictCache,
};

/// The operations the manager never runs twice at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SessionCheck,
    ProfileFetch,
}

/// Outcome of one pass through the profile fetch.
enum ProfileAttempt {
    /// The backend said 401 and a retry is still allowed.
    Retry,
    /// Finished; `true` when a profile was stored.
    Done(bool),
}

struct Inner<P, A> {
    provider: Arc<P>,
    api: Arc<A>,
    config: SessionConfig,
    cache: VerdictCache,
    flights: SingleFlight<Operation, bool>,
    snapshot: watch::Sender<SessionSnapshot>,
    mounted: AtomicBool,
    /// Bumped by every forced sign-out.
    sign_outs: AtomicU64,
    init: Mutex<Option<JoinHandle<()>>>,
}

/// Manages the signed-in clinician's session.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ start() ──(init_delay)──→ check_session()
///                                        │
///                     ┌──── valid ───────┴──── invalid ────┐
///                     ▼                                    ▼
///     handle_get_profile() + quota              loading = false
///                     │
///                     ▼
///        ... force_sign_out() / dispose()
/// ```
pub struct SessionManager<P, A> {
    inner: Arc<Inner<P, A>>,
}

impl<P, A> Clone for SessionManager<P, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: IdentityProvider, A: ClinicApi> SessionManager<P, A> {
    /// Creates a mounted manager with an empty cache and no profile.
    ///
    /// Nothing runs until [`start`](Self::start) is called.
    pub fn new(provider: Arc<P>, api: Arc<A>, config: SessionConfig) -> Self {
        let config = config.validated();
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                provider,
                api,
                cache: VerdictCache::new(config.cache_ttl),
                flights: SingleFlight::new(),
                snapshot,
                mounted: AtomicBool::new(true),
                sign_outs: AtomicU64::new(0),
                init: Mutex::new(None),
                config,
            }),
        }
    }

    // -- lifecycle ----------------------------------------------------------

    /// Schedules initialization: after `init_delay`, check the session and
    /// load the profile and quota if it is valid.
    ///
    /// Must be called from within a Tokio runtime. Does nothing once
    /// disposed. Calling it again replaces the pending initialization.
    pub fn start(&self) {
        if !self.is_mounted() {
            return;
        }
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(manager.inner.config.init_delay).await;
            manager.initialize().await;
        });
        let previous = self
            .inner
            .init
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Unmounts the manager: no further state is published and a pending
    /// initialization is aborted. In-flight provider and backend calls are
    /// left to finish.
    pub fn dispose(&self) {
        self.inner.mounted.store(false, Ordering::SeqCst);
        let pending = self
            .inner
            .init
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = pending {
            handle.abort();
        }
        tracing::info!("session manager disposed");
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    async fn initialize(&self) {
        if !self.is_mounted() {
            return;
        }
        tracing::info!("initializing session");

        let generation = self.sign_out_generation();
        let has_session = self.check_session(false).await && !self.signed_out_since(generation);
        if !self.is_mounted() {
            return;
        }

        if has_session {
            tokio::join!(
                self.handle_get_profile(false),
                self.handle_get_available_recording()
            );
        } else {
            tracing::info!("no active session");
            self.publish(|s| s.loading = false);
        }
    }

    // -- session check ------------------------------------------------------

    /// Returns whether a valid session exists.
    ///
    /// Answers from the cache while the last verdict is fresh, joins a
    /// check that is already running, and otherwise asks the provider for
    /// tokens and the current identity at the same time. Valid only when
    /// both succeed. `force_refresh` skips the cache and any running check,
    /// and asks the provider to refresh its tokens.
    pub async fn check_session(&self, force_refresh: bool) -> bool {
        if force_refresh {
            self.invalidate_session_cache();
        } else if let Some(valid) = self.inner.cache.fresh() {
            tracing::debug!(valid, "using cached session verdict");
            return valid;
        }

        let linger = self.inner.config.check_linger;
        let manager = self.clone();
        let flight = if force_refresh {
            self.inner
                .flights
                .start(Operation::SessionCheck, linger, manager.verify(true))
        } else {
            let (flight, joined) = self.inner.flights.join_or_start(
                Operation::SessionCheck,
                linger,
                || manager.verify(false),
            );
            if joined {
                tracing::debug!("joining in-flight session check");
            }
            flight
        };
        flight.await
    }

    async fn verify(self, force_refresh: bool) -> bool {
        let epoch = self.inner.cache.epoch();
        self.publish(|s| {
            if s.state.shows_checking() {
                s.state = SessionState::Checking;
            }
        });

        let provider = &self.inner.provider;
        let (tokens, identity) = tokio::join!(
            provider.fetch_tokens(force_refresh),
            provider.current_identity()
        );

        let has_tokens = matches!(&tokens, Ok(Some(t)) if t.has_access_token());
        let has_user = identity.is_ok();
        let valid = has_tokens && has_user;

        if !self.inner.cache.store_if_current(valid, epoch) {
            // Signed out or invalidated while the provider answered.
            tracing::debug!(valid, force_refresh, "discarding superseded session verdict");
            return valid;
        }
        self.publish(|s| {
            if valid {
                s.state = SessionState::Authenticated;
            } else {
                s.state = SessionState::Unauthenticated;
                s.profile = None;
            }
        });

        tracing::info!(has_tokens, has_user, valid, force_refresh, "session check complete");
        valid
    }

    /// Drops the cached verdict and forgets any running check, so the
    /// next [`check_session`](Self::check_session) asks the provider.
    /// A check already running keeps going but can no longer write its
    /// verdict or state.
    pub fn invalidate_session_cache(&self) {
        tracing::debug!("invalidating session cache");
        self.inner.cache.invalidate();
        self.inner.flights.forget(&Operation::SessionCheck);
    }

    // -- tokens -------------------------------------------------------------

    /// Polls the provider until it reports an access token.
    ///
    /// Makes up to `token_poll_attempts` attempts, `token_poll_interval`
    /// apart. A provider error counts as "not yet".
    pub async fn wait_for_tokens(&self) -> bool {
        let attempts = self.inner.config.token_poll_attempts;
        for attempt in 1..=attempts {
            match self.inner.provider.fetch_tokens(false).await {
                Ok(Some(tokens)) if tokens.has_access_token() => {
                    tracing::info!(attempt, "tokens available");
                    return true;
                }
                Ok(_) => {
                    tracing::debug!(attempt, attempts, "tokens not available yet");
                }
                Err(e) => {
                    tracing::debug!(attempt, attempts, error = %e, "token fetch failed");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.inner.config.token_poll_interval).await;
            }
        }
        tracing::warn!(attempts, "tokens did not become available");
        false
    }

    // -- profile ------------------------------------------------------------

    /// Loads the profile from `GET /user`.
    ///
    /// Returns immediately, with no side effects, when a fetch is already
    /// running. A 401 triggers one token refresh and a forced retry; a
    /// second 401 signs the user out. The loading flag is raised for the
    /// duration of the fetch. A response that arrives after a sign-out is
    /// discarded.
    pub async fn handle_get_profile(&self, force_refresh: bool) {
        let manager = self.clone();
        let fetch = async move { manager.fetch_profile(force_refresh).await };
        let Some(flight) =
            self.inner
                .flights
                .try_start(Operation::ProfileFetch, Duration::ZERO, fetch)
        else {
            tracing::debug!("profile fetch already running");
            return;
        };
        flight.await;
    }

    async fn fetch_profile(&self, force_refresh: bool) -> bool {
        self.publish(|s| s.loading = true);

        let limit = self.inner.config.profile_retry_limit;
        let mut force_refresh = force_refresh;
        let mut retries = 0;
        let stored = loop {
            match self.profile_attempt(force_refresh, retries < limit).await {
                ProfileAttempt::Retry => {
                    retries += 1;
                    force_refresh = true;
                    tracing::warn!(retry = retries, "retrying profile fetch after token refresh");
                }
                ProfileAttempt::Done(stored) => break stored,
            }
        };

        self.publish(|s| s.loading = false);
        stored
    }

    async fn profile_attempt(&self, force_refresh: bool, may_retry: bool) -> ProfileAttempt {
        let generation = self.sign_out_generation();
        if force_refresh {
            if !self.wait_for_tokens().await {
                self.clear_profile();
                return ProfileAttempt::Done(false);
            }
            self.invalidate_session_cache();
        }

        if !self.check_session(force_refresh).await {
            tracing::info!("no valid session, skipping profile fetch");
            self.clear_profile();
            return ProfileAttempt::Done(false);
        }

        let response = self.inner.api.get_profile().await;
        if self.signed_out_since(generation) {
            tracing::debug!("signed out during profile fetch, discarding response");
            return ProfileAttempt::Done(false);
        }

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "profile fetch failed");
                self.clear_profile();
                if e.is_unauthorized() {
                    self.force_sign_out().await;
                }
                return ProfileAttempt::Done(false);
            }
        };

        if response.is_unauthorized() && may_retry {
            tracing::info!("access token rejected, refreshing");
            self.invalidate_session_cache();
            if let Err(e) = self.inner.provider.fetch_tokens(true).await {
                tracing::warn!(error = %e, "token refresh failed");
            }
            tokio::time::sleep(self.inner.config.refresh_retry_delay).await;
            return ProfileAttempt::Retry;
        }

        let status = response.status;
        let unauthorized = response.is_unauthorized();
        match response.into_ok_body() {
            Some(body) => {
                tracing::info!(email = %body.profile.email, "profile loaded");
                self.publish(|s| {
                    s.profile = Some(body.profile);
                    s.state = SessionState::Authenticated;
                });
                ProfileAttempt::Done(true)
            }
            None => {
                tracing::warn!(status, "profile fetch rejected");
                self.clear_profile();
                if unauthorized {
                    self.force_sign_out().await;
                }
                ProfileAttempt::Done(false)
            }
        }
    }

    fn clear_profile(&self) {
        self.publish(|s| {
            s.profile = None;
            s.state = SessionState::Unauthenticated;
        });
    }

    // -- quota --------------------------------------------------------------

    /// Loads the recording quota. Anything but a 200 zeroes both counters.
    /// The answer is dropped if a sign-out happened meanwhile.
    pub async fn handle_get_available_recording(&self) {
        let generation = self.sign_out_generation();
        let response = self.inner.api.get_available_recording().await;
        if self.signed_out_since(generation) {
            tracing::debug!("signed out during quota fetch, discarding response");
            return;
        }
        let quota = match response {
            Ok(response) => {
                let status = response.status;
                response.into_ok_body().unwrap_or_else(|| {
                    tracing::warn!(status, "recording quota unavailable");
                    RecordingQuota::default()
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "recording quota fetch failed");
                RecordingQuota::default()
            }
        };
        tracing::debug!(available = quota.available, total = quota.total, "recording quota");
        self.publish(|s| {
            s.available_recording = quota.available;
            s.total_recording = quota.total;
        });
    }

    // -- sign-out -----------------------------------------------------------

    /// Clears local state, then signs out globally if the provider still
    /// holds tokens. Remote failures are logged and ignored.
    pub async fn force_sign_out(&self) {
        tracing::info!("forcing sign-out");
        self.inner.sign_outs.fetch_add(1, Ordering::SeqCst);
        self.publish(|s| {
            s.profile = None;
            s.available_recording = 0;
            s.total_recording = 0;
            s.state = SessionState::Unauthenticated;
        });
        self.invalidate_session_cache();

        match self.inner.provider.fetch_tokens(false).await {
            Ok(Some(_)) => {
                let options = SignOutOptions { global: true };
                if let Err(e) = self.inner.provider.sign_out(options).await {
                    tracing::warn!(error = %e, "sign-out failed, local state already cleared");
                }
            }
            Ok(None) => tracing::debug!("no active session to sign out"),
            Err(e) => {
                tracing::warn!(error = %e, "could not read session before sign-out");
            }
        }

        tokio::time::sleep(self.inner.config.sign_out_settle).await;
        tracing::info!("sign-out complete");
    }

    fn sign_out_generation(&self) -> u64 {
        self.inner.sign_outs.load(Ordering::SeqCst)
    }

    fn signed_out_since(&self, generation: u64) -> bool {
        self.sign_out_generation() != generation
    }

    /// Same as [`force_sign_out`](Self::force_sign_out).
    pub async fn clear_session(&self) {
        self.force_sign_out().await;
    }

    // -- observation --------------------------------------------------------

    /// Subscribes to state changes. The receiver starts at the current
    /// snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.inner.snapshot.borrow().profile.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.snapshot.borrow().loading
    }

    pub fn state(&self) -> SessionState {
        self.inner.snapshot.borrow().state
    }

    pub fn quota(&self) -> RecordingQuota {
        self.inner.snapshot.borrow().quota()
    }

    /// Replaces the profile directly, e.g. after the user edits it.
    pub fn set_profile(&self, profile: Option<UserProfile>) {
        self.publish(|s| s.profile = profile);
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.inner.provider
    }

    pub fn api(&self) -> &Arc<A> {
        &self.inner.api
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    fn publish(&self, update: impl FnOnce(&mut SessionSnapshot)) {
        if !self.is_mounted() {
            return;
        }
        self.inner.snapshot.send_if_modified(|snapshot| {
            let before = snapshot.clone();
            update(snapshot);
            *snapshot != before
        });
    }
}
