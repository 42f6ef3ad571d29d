//! Identity-provider hook.
//!
//! The dashboard doesn't authenticate anyone itself; a hosted identity
//! provider (Cognito, Auth0, Firebase, …) does. This module defines the
//! [`IdentityProvider`] trait: the handful of calls the session layer
//! makes against that provider. Production wires in an SDK-backed
//! implementation, tests wire in a scripted one.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::IdentityError;

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// The tokens the provider currently holds for the signed-in user.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub id_token: Option<String>,
}

impl TokenSet {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            id_token: None,
        }
    }

    /// An empty access token counts as "no token yet".
    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }
}

// Tokens are credentials: keep them out of logs.
impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Who the provider says is signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}

/// How the provider should verify a username/password pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthFlow {
    /// Plain username + password sent to the provider.
    #[default]
    UserPassword,
    /// Secure Remote Password.
    Srp,
}

/// Username/password credentials, already trimmed and validated.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub flow: AuthFlow,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("flow", &self.flow)
            .finish()
    }
}

/// Result of a username/password sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignInOutcome {
    /// `false` when the provider wants another step (MFA, new password).
    pub is_signed_in: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignOutOptions {
    /// Revoke the refresh token on every device, not just this one.
    pub global: bool,
}

/// Social identity providers offered on the login screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialProvider {
    Google,
    Apple,
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Google => write!(f, "Google"),
            Self::Apple => write!(f, "Apple"),
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The calls the session layer makes against the hosted identity provider.
///
/// # Trait bounds
///
/// `Send + Sync + 'static`: the provider is shared behind an `Arc` by the
/// session manager, the login flow and the HTTP client's token source, and
/// its futures run inside spawned Tokio tasks.
///
/// # Example
///
/// ```rust
/// use clinic_session::{
///     Credentials, Identity, IdentityError, IdentityProvider, SignInOutcome,
///     SignOutOptions, SocialProvider, TokenSet,
/// };
///
/// /// Always signed in with a fixed token. Development only.
/// struct DevProvider;
///
/// impl IdentityProvider for DevProvider {
///     async fn fetch_tokens(&self, _force_refresh: bool) -> Result<Option<TokenSet>, IdentityError> {
///         Ok(Some(TokenSet::new("dev-token")))
///     }
///     async fn current_identity(&self) -> Result<Identity, IdentityError> {
///         Ok(Identity { user_id: "dev".into(), username: "dev@clinic.test".into() })
///     }
///     async fn sign_in(&self, _credentials: &Credentials) -> Result<SignInOutcome, IdentityError> {
///         Ok(SignInOutcome { is_signed_in: true })
///     }
///     async fn sign_out(&self, _options: SignOutOptions) -> Result<(), IdentityError> {
///         Ok(())
///     }
///     async fn sign_in_with_redirect(&self, _provider: SocialProvider) -> Result<(), IdentityError> {
///         Ok(())
///     }
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Returns the current token set, `None` when nobody is signed in.
    ///
    /// `force_refresh` asks the provider to exchange the refresh token for
    /// new tokens even if the cached ones haven't expired.
    fn fetch_tokens(
        &self,
        force_refresh: bool,
    ) -> impl Future<Output = Result<Option<TokenSet>, IdentityError>> + Send;

    /// Returns the signed-in identity, or an error if there is none.
    fn current_identity(
        &self,
    ) -> impl Future<Output = Result<Identity, IdentityError>> + Send;

    fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<SignInOutcome, IdentityError>> + Send;

    fn sign_out(
        &self,
        options: SignOutOptions,
    ) -> impl Future<Output = Result<(), IdentityError>> + Send;

    /// Starts a hosted-UI sign-in with a social provider. The outcome
    /// arrives later as an [`AuthEvent`](crate::AuthEvent).
    fn sign_in_with_redirect(
        &self,
        provider: SocialProvider,
    ) -> impl Future<Output = Result<(), IdentityError>> + Send;
}

// ---------------------------------------------------------------------------
// Token source adapter
// ---------------------------------------------------------------------------

/// Feeds the HTTP client's bearer token from an identity provider.
pub struct ProviderTokens<P> {
    provider: Arc<P>,
}

impl<P> ProviderTokens<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

impl<P: IdentityProvider> clinic_api::TokenSource for ProviderTokens<P> {
    async fn access_token(&self) -> Option<String> {
        match self.provider.fetch_tokens(false).await {
            Ok(Some(tokens)) if tokens.has_access_token() => {
                Some(tokens.access_token)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "no token for backend request");
                None
            }
        }
    }
}
