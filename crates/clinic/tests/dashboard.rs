//! End-to-end tests: a `Dashboard` over a scripted identity provider and a
//! local HTTP responder that routes by path.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clinic::prelude::*;
use clinic::{ApiError, RecordingDraft, RecordingKind, RecordingQuota, SessionError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// =========================================================================
// Scripted identity provider
// =========================================================================

#[derive(Default)]
struct TestProvider {
    signed_in: AtomicBool,
    sign_in_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl IdentityProvider for TestProvider {
    async fn fetch_tokens(&self, _force_refresh: bool) -> Result<Option<TokenSet>, clinic::IdentityError> {
        if self.signed_in.load(Ordering::SeqCst) {
            Ok(Some(TokenSet::new("test-token")))
        } else {
            Ok(None)
        }
    }

    async fn current_identity(&self) -> Result<Identity, clinic::IdentityError> {
        if self.signed_in.load(Ordering::SeqCst) {
            Ok(Identity {
                user_id: "u-1".into(),
                username: "dr@clinic.com".into(),
            })
        } else {
            Err(clinic::IdentityError::NotSignedIn)
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<SignInOutcome, clinic::IdentityError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if credentials.password != "secret1" {
            return Err(clinic::IdentityError::NotAuthorized("bad password".into()));
        }
        self.signed_in.store(true, Ordering::SeqCst);
        Ok(SignInOutcome { is_signed_in: true })
    }

    async fn sign_out(&self, _options: SignOutOptions) -> Result<(), clinic::IdentityError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.signed_in.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_in_with_redirect(&self, _provider: SocialProvider) -> Result<(), clinic::IdentityError> {
        Ok(())
    }
}

// =========================================================================
// Routing HTTP responder
// =========================================================================

type Route = (&'static str, u16, &'static str);

const PROFILE: Route = (
    "/user",
    200,
    r#"{"profile":{"id":"u-1","email":"dr@clinic.com","name":"Dr. Ada"}}"#,
);
const QUOTA: Route = ("/signature/available-recording", 200, r#"{"available":2,"total":5}"#);

/// Captured raw requests, in arrival order.
type Requests = Arc<Mutex<Vec<String>>>;

async fn serve(routes: Vec<Route>) -> (String, Requests) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let routes = routes.clone();
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                let path = request
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .split('?')
                    .next()
                    .unwrap_or("/")
                    .to_string();
                log.lock().unwrap().push(request);

                let (status, body) = routes
                    .iter()
                    .find(|(p, _, _)| *p == path)
                    .map(|(_, s, b)| (*s, *b))
                    .unwrap_or((404, ""));
                let response = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.ok();
                socket.shutdown().await.ok();
            });
        }
    });

    (format!("http://{addr}"), requests)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else {
            break;
        };
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        let Some(header_end) = text.find("\r\n\r\n") else {
            continue;
        };
        let headers = text[..header_end].to_ascii_lowercase();
        if headers.contains("transfer-encoding: chunked") {
            if text.ends_with("0\r\n\r\n") {
                break;
            }
            continue;
        }
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= header_end + 4 + content_length {
            break;
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn requests_to(requests: &Requests, path: &str) -> Vec<String> {
    let prefix = format!(" {path} ");
    requests
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.lines().next().is_some_and(|line| line.contains(&prefix)))
        .cloned()
        .collect()
}

// =========================================================================
// Helpers
// =========================================================================

fn fast_config() -> SessionConfig {
    SessionConfig {
        token_poll_interval: Duration::from_millis(10),
        refresh_retry_delay: Duration::from_millis(10),
        sign_out_settle: Duration::from_millis(1),
        init_delay: Duration::from_millis(1),
        ..SessionConfig::default()
    }
}

fn dashboard(base: &str) -> Dashboard<TestProvider> {
    Dashboard::<TestProvider>::builder()
        .base_url(base)
        .session_config(fast_config())
        .build(TestProvider::default())
        .unwrap()
}

async fn wait_for(
    dashboard: &Dashboard<TestProvider>,
    condition: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = dashboard.session().subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(condition))
        .await
        .expect("condition not reached in time")
        .expect("session dropped")
        .clone();
    snapshot
}

fn draft() -> RecordingDraft {
    RecordingDraft {
        audio: vec![0xFF, 0xFB, 0x90, 0x00],
        name: "  ".into(),
        description: "Follow-up".into(),
        seconds: 185,
        kind: RecordingKind::Client,
        client_id: Some("c-7".into()),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[test]
fn test_build_invalid_base_url_returns_api_error() {
    let result = Dashboard::<TestProvider>::builder()
        .base_url("ftp://clinic.example")
        .build(TestProvider::default());
    assert!(matches!(result, Err(ClinicError::Api(ApiError::InvalidUrl(_)))));
}

#[tokio::test]
async fn test_start_without_session_settles_unauthenticated() {
    let (base, requests) = serve(vec![PROFILE, QUOTA]).await;
    let mut dashboard = dashboard(&base);

    let _notices = dashboard.start();
    let snapshot = wait_for(&dashboard, |s| !s.loading).await;

    assert_eq!(snapshot.state, SessionState::Unauthenticated);
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_sign_in_loads_profile_with_bearer_token() {
    let (base, requests) = serve(vec![PROFILE, QUOTA]).await;
    let mut dashboard = dashboard(&base);
    let mut notices = dashboard.start();
    wait_for(&dashboard, |s| !s.loading).await;

    dashboard
        .sign_in(&LoginForm::new(" dr@clinic.com ", "secret1"))
        .await
        .unwrap();

    let snapshot = wait_for(&dashboard, |s| s.profile.is_some() && !s.loading).await;
    assert_eq!(snapshot.profile.map(|p| p.name), Some("Dr. Ada".to_string()));
    assert_eq!(snapshot.state, SessionState::Authenticated);

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Success);

    let profile_requests = requests_to(&requests, "/user");
    assert_eq!(profile_requests.len(), 1);
    assert!(profile_requests[0]
        .to_ascii_lowercase()
        .contains("authorization: bearer test-token"));
}

#[tokio::test]
async fn test_sign_in_announces_signed_in_exactly_once() {
    let (base, _requests) = serve(vec![PROFILE, QUOTA]).await;
    let dashboard = dashboard(&base);
    let mut events = dashboard.events().subscribe();

    dashboard
        .sign_in(&LoginForm::new("dr@clinic.com", "secret1"))
        .await
        .unwrap();

    assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_sign_in_invalid_form_skips_provider() {
    let (base, _requests) = serve(vec![]).await;
    let dashboard = dashboard(&base);

    let err = dashboard
        .sign_in(&LoginForm::new("not-an-email", "secret1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClinicError::Session(SessionError::Validation(_))));
    assert_eq!(dashboard.provider().sign_in_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_sign_in_wrong_password_maps_user_message() {
    let (base, _requests) = serve(vec![]).await;
    let dashboard = dashboard(&base);

    let err = dashboard
        .sign_in(&LoginForm::new("dr@clinic.com", "wrong-password"))
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Incorrect email or password.");
}

#[tokio::test]
async fn test_sign_out_clears_session() {
    let (base, _requests) = serve(vec![PROFILE, QUOTA]).await;
    let mut dashboard = dashboard(&base);
    let _notices = dashboard.start();
    dashboard
        .sign_in(&LoginForm::new("dr@clinic.com", "secret1"))
        .await
        .unwrap();
    wait_for(&dashboard, |s| s.profile.is_some()).await;

    dashboard.sign_out().await;

    let snapshot = dashboard.session().snapshot();
    assert!(snapshot.profile.is_none());
    assert_eq!(snapshot.state, SessionState::Unauthenticated);
    assert_eq!(dashboard.provider().sign_out_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_save_recording_uploads_then_saves_and_refreshes_quota() {
    let (base, requests) = serve(vec![
        ("/convert", 200, r#"{"audioUrl":"https://cdn.clinic.example/a.mp3"}"#),
        ("/recording", 200, "{}"),
        QUOTA,
    ])
    .await;
    let dashboard = dashboard(&base);

    dashboard.save_recording(draft()).await.unwrap();

    let saved = requests_to(&requests, "/recording");
    assert_eq!(saved.len(), 1);
    assert!(saved[0].contains(r#""audioUrl":"https://cdn.clinic.example/a.mp3""#));
    assert!(saved[0].contains(r#""name":"Session notes""#));
    assert!(saved[0].contains(r#""duration":"3m 5s""#));
    assert!(saved[0].contains(r#""clientId":"c-7""#));
    assert_eq!(
        dashboard.session().quota(),
        RecordingQuota { available: 2, total: 5 }
    );
}

#[tokio::test]
async fn test_save_recording_upload_failure_skips_save() {
    let (base, requests) = serve(vec![("/convert", 500, ""), ("/recording", 200, "{}")]).await;
    let dashboard = dashboard(&base);

    let err = dashboard.save_recording(draft()).await.unwrap_err();

    assert!(matches!(err, ClinicError::Api(ApiError::Status(500))));
    assert!(requests_to(&requests, "/recording").is_empty());
}

#[tokio::test]
async fn test_shutdown_disposes_session() {
    let (base, _requests) = serve(vec![]).await;
    let mut dashboard = dashboard(&base);
    let _notices = dashboard.start();
    let session = dashboard.session().clone();

    dashboard.shutdown().await;

    assert!(!session.is_mounted());
}
