use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use clinic::prelude::*;
use clinic::{IdentityError, PatientQuery};

// ---------------------------------------------------------------------------
// In-memory identity provider
// ---------------------------------------------------------------------------

/// One hard-coded account, tokens kept in memory. Development only.
struct DemoProvider {
    email: String,
    password: String,
    tokens: Mutex<Option<TokenSet>>,
    issued: AtomicU64,
}

impl DemoProvider {
    fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            tokens: Mutex::new(None),
            issued: AtomicU64::new(0),
        }
    }

    fn issue(&self) -> TokenSet {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        TokenSet::new(format!("demo-access-{n}"))
    }

    fn current(&self) -> Option<TokenSet> {
        self.tokens.lock().map(|t| t.clone()).unwrap_or(None)
    }

    fn replace(&self, tokens: Option<TokenSet>) {
        if let Ok(mut slot) = self.tokens.lock() {
            *slot = tokens;
        }
    }
}

impl IdentityProvider for DemoProvider {
    async fn fetch_tokens(&self, force_refresh: bool) -> Result<Option<TokenSet>, IdentityError> {
        let current = self.current();
        if force_refresh && current.is_some() {
            let fresh = self.issue();
            self.replace(Some(fresh.clone()));
            return Ok(Some(fresh));
        }
        Ok(current)
    }

    async fn current_identity(&self) -> Result<Identity, IdentityError> {
        match self.current() {
            Some(_) => Ok(Identity {
                user_id: "demo".into(),
                username: self.email.clone(),
            }),
            None => Err(IdentityError::NotSignedIn),
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<SignInOutcome, IdentityError> {
        if credentials.username != self.email {
            return Err(IdentityError::UserNotFound);
        }
        if credentials.password != self.password {
            return Err(IdentityError::NotAuthorized("wrong password".into()));
        }
        self.replace(Some(self.issue()));
        Ok(SignInOutcome { is_signed_in: true })
    }

    async fn sign_out(&self, _options: SignOutOptions) -> Result<(), IdentityError> {
        self.replace(None);
        Ok(())
    }

    async fn sign_in_with_redirect(&self, provider: SocialProvider) -> Result<(), IdentityError> {
        Err(IdentityError::Provider(format!("{provider} sign-in is not available in the demo")))
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    clinic::logging::init();

    let email = std::env::var("CLINIC_DEMO_EMAIL").unwrap_or_else(|_| "dr@clinic.test".into());
    let password = std::env::var("CLINIC_DEMO_PASSWORD").unwrap_or_else(|_| "secret1".into());

    let mut dashboard = Dashboard::<DemoProvider>::builder()
        .api_config(ApiConfig::from_env()?)
        .build(DemoProvider::new(email.clone(), password.clone()))?;

    let mut notices = dashboard.start();
    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            eprintln!("[{:?}] {}", notice.level, notice.message);
        }
    });

    if let Err(e) = dashboard.sign_in(&LoginForm::new(email, password)).await {
        eprintln!("sign-in failed: {}", e.user_message());
        dashboard.shutdown().await;
        return Ok(());
    }

    let mut states = dashboard.session().subscribe();
    // The sign-in event loads the profile in the background.
    let loaded = tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|s| s.profile.is_some() && !s.loading),
    )
    .await
    .is_ok_and(|r| r.is_ok());
    if !loaded {
        tracing::warn!("profile did not load in time");
    }

    let snapshot = dashboard.session().snapshot();
    eprintln!("session: {}", snapshot.state);
    match &snapshot.profile {
        Some(profile) => eprintln!("signed in as {} <{}>", profile.name, profile.email),
        None => eprintln!("no profile loaded (is the backend running at {}?)", dashboard.backend().base_url()),
    }

    if snapshot.state.is_authenticated() {
        match dashboard.backend().list_patients(&PatientQuery::default()).await {
            Ok(resp) => match resp.into_ok_body() {
                Some(page) => eprintln!("{} patients on page 1 of {}", page.items.len(), page.pages),
                None => eprintln!("patient list unavailable"),
            },
            Err(e) => eprintln!("patient list failed: {e}"),
        }
    }

    dashboard.sign_out().await;
    dashboard.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
            flow: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_demo_provider_sign_in_issues_tokens() {
        let provider = DemoProvider::new("dr@clinic.test", "secret1");
        assert_eq!(provider.fetch_tokens(false).await.unwrap(), None);

        let outcome = provider.sign_in(&creds("dr@clinic.test", "secret1")).await.unwrap();

        assert!(outcome.is_signed_in);
        assert!(provider.fetch_tokens(false).await.unwrap().is_some());
        assert_eq!(provider.current_identity().await.unwrap().username, "dr@clinic.test");
    }

    #[tokio::test]
    async fn test_demo_provider_rejects_unknown_user_and_bad_password() {
        let provider = DemoProvider::new("dr@clinic.test", "secret1");
        assert_eq!(
            provider.sign_in(&creds("other@clinic.test", "secret1")).await,
            Err(IdentityError::UserNotFound)
        );
        assert!(matches!(
            provider.sign_in(&creds("dr@clinic.test", "nope")).await,
            Err(IdentityError::NotAuthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_demo_provider_force_refresh_rotates_token() {
        let provider = DemoProvider::new("dr@clinic.test", "secret1");
        provider.sign_in(&creds("dr@clinic.test", "secret1")).await.unwrap();
        let before = provider.fetch_tokens(false).await.unwrap();

        let after = provider.fetch_tokens(true).await.unwrap();

        assert_ne!(before, after);
        provider.sign_out(SignOutOptions { global: true }).await.unwrap();
        assert!(provider.current_identity().await.is_err());
    }
}
