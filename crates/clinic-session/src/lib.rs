//! Session management for the clinic dashboard.
//!
//! This crate owns the authentication lifecycle of a signed-in clinician:
//!
//! 1. **Identity**: talking to the hosted identity provider
//!    ([`IdentityProvider`] trait)
//! 2. **Session checks**: deciding whether a valid session exists, with a
//!    short-lived verdict cache and request coalescing ([`SessionManager`])
//! 3. **Profile**: loading the clinician's profile, retrying once when a
//!    token expired, forcing sign-out when it can't recover
//! 4. **Events**: reacting to provider lifecycle events ([`AuthEventBus`],
//!    [`attach_listener`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Presentation (above)  ← header, login form, list views read SessionSnapshot
//!     ↕
//! Session Layer (this crate)  ← verdict cache, single-flight, retries
//!     ↕
//! Api Layer (below)  ← UserProfile, ClinicApi, TokenSource
//! ```

#![allow(async_fn_in_trait)]

mod cache;
mod config;
mod error;
mod events;
mod flight;
mod identity;
mod listener;
mod login;
mod manager;
mod state;

pub use cache::{Verdict, VerdictCache};
pub use config::SessionConfig;
pub use error::{IdentityError, SessionError};
pub use events::{AuthEvent, AuthEventBus, Subscription};
pub use flight::{Flight, SingleFlight};
pub use identity::{
    AuthFlow, Credentials, Identity, IdentityProvider, ProviderTokens,
    SignInOutcome, SignOutOptions, SocialProvider, TokenSet,
};
pub use listener::{attach_listener, Notice, NoticeLevel};
pub use login::{LoginFlow, LoginForm, MIN_PASSWORD_LEN};
pub use manager::{Operation, SessionManager};
pub use state::{SessionSnapshot, SessionState};
