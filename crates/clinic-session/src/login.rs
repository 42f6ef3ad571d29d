//! The login screen's logic: validate the form, then sign in.

use std::sync::Arc;

use crate::{
    AuthFlow, Credentials, IdentityProvider, SessionError, SocialProvider,
};

pub const MIN_PASSWORD_LEN: usize = 6;

/// What the clinician typed into the login form.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Trims both fields and checks them.
    ///
    /// # Errors
    /// [`SessionError::Validation`] with a user-facing message when the
    /// email is malformed or the password is shorter than
    /// [`MIN_PASSWORD_LEN`].
    pub fn validate(&self) -> Result<Credentials, SessionError> {
        let email = self.email.trim();
        let password = self.password.trim();

        if !looks_like_email(email) {
            return Err(SessionError::Validation("Invalid email".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(SessionError::Validation("Invalid password".into()));
        }

        Ok(Credentials {
            username: email.to_string(),
            password: password.to_string(),
            flow: AuthFlow::UserPassword,
        })
    }
}

/// `local@domain.tld`, no whitespace, exactly one `@`.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Signs clinicians in against the identity provider.
///
/// Success is not reported here beyond `Ok(())`: the provider emits
/// [`AuthEvent::SignedIn`](crate::AuthEvent::SignedIn) and the listener
/// attached with [`attach_listener`](crate::attach_listener) loads the
/// profile.
pub struct LoginFlow<P> {
    provider: Arc<P>,
}

impl<P: IdentityProvider> LoginFlow<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Validates `form` and signs in with the user-password flow.
    ///
    /// # Errors
    /// - [`SessionError::Validation`] for a bad form (the provider is not called)
    /// - [`SessionError::Identity`] when the provider rejects the credentials
    /// - [`SessionError::SignInIncomplete`] when the provider wants another step
    pub async fn sign_in(&self, form: &LoginForm) -> Result<(), SessionError> {
        let credentials = form.validate()?;
        let outcome = self.provider.sign_in(&credentials).await.inspect_err(|e| {
            tracing::info!(username = %credentials.username, error = %e, "sign-in rejected");
        })?;

        if !outcome.is_signed_in {
            tracing::warn!(username = %credentials.username, "sign-in needs another step");
            return Err(SessionError::SignInIncomplete);
        }
        tracing::info!(username = %credentials.username, "signed in");
        Ok(())
    }

    /// Starts a hosted-UI sign-in with `provider`.
    pub async fn sign_in_with_redirect(
        &self,
        provider: SocialProvider,
    ) -> Result<(), SessionError> {
        self.provider
            .sign_in_with_redirect(provider)
            .await
            .inspect_err(|e| {
                tracing::warn!(%provider, error = %e, "could not start social sign-in");
            })?;
        Ok(())
    }
}
