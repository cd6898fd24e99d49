//! Fake identity provider for tests: a real HTTP server on a loopback port.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::json;

use crate::oauth::{AuthClient, OAuthConfig};

pub(crate) const REDIRECT_URI: &str = "http://app.test/auth/callback";

enum Grant {
    Token(String),
    Raw(String),
}

#[derive(Default)]
struct Ledger {
    grants: HashMap<String, Grant>,
    profiles: HashMap<String, String>,
    rejected: HashSet<String>,
    stall_tokens: bool,
    token_requests: usize,
    token_redirect_uris: Vec<String>,
    profile_bearers: Vec<String>,
}

pub(crate) struct FakeProvider {
    addr: SocketAddr,
    ledger: Arc<Mutex<Ledger>>,
}

impl FakeProvider {
    pub(crate) async fn start() -> Self {
        let ledger = Arc::new(Mutex::new(Ledger::default()));
        let router = Router::new()
            .route("/oauth/token", post(token))
            .route("/api/v1/people/me", get(profile))
            .with_state(ledger.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, ledger }
    }

    pub(crate) fn config(&self) -> OAuthConfig {
        OAuthConfig::new("test-client", "test-secret", REDIRECT_URI.parse().unwrap())
            .unwrap()
            .with_host(&format!("http://{}", self.addr).parse().unwrap())
            .unwrap()
    }

    pub(crate) fn client(&self) -> AuthClient {
        AuthClient::new(self.config()).unwrap()
    }

    /// `code` exchanges (once) for `token`, which returns `profile_body`.
    pub(crate) fn issue_code(&self, code: &str, token: &str, profile_body: &str) {
        let mut ledger = self.ledger.lock();
        ledger
            .grants
            .insert(code.into(), Grant::Token(token.into()));
        ledger.profiles.insert(token.into(), profile_body.into());
    }

    /// `code` exchanges (once) for a 200 response with `body` verbatim.
    pub(crate) fn issue_raw_token(&self, code: &str, body: &str) {
        self.ledger
            .lock()
            .grants
            .insert(code.into(), Grant::Raw(body.into()));
    }

    pub(crate) fn reject_bearer(&self, token: &str) {
        self.ledger.lock().rejected.insert(token.into());
    }

    /// Token requests are accepted but never answered.
    pub(crate) fn stall_token_endpoint(&self) {
        self.ledger.lock().stall_tokens = true;
    }

    pub(crate) fn token_requests(&self) -> usize {
        self.ledger.lock().token_requests
    }

    pub(crate) fn token_redirect_uris(&self) -> Vec<String> {
        self.ledger.lock().token_redirect_uris.clone()
    }

    pub(crate) fn profile_bearers(&self) -> Vec<String> {
        self.ledger.lock().profile_bearers.clone()
    }
}

async fn token(
    State(ledger): State<Arc<Mutex<Ledger>>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let stalled = ledger.lock().stall_tokens;
    if stalled {
        std::future::pending::<()>().await;
    }

    let mut ledger = ledger.lock();
    ledger.token_requests += 1;
    if let Some(uri) = form.get("redirect_uri") {
        ledger.token_redirect_uris.push(uri.clone());
    }

    let authenticated = form.get("grant_type").map(String::as_str) == Some("authorization_code")
        && form.get("client_id").map(String::as_str) == Some("test-client")
        && form.get("client_secret").map(String::as_str) == Some("test-secret")
        && form.get("redirect_uri").map(String::as_str) == Some(REDIRECT_URI);
    if !authenticated {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid_client" })))
            .into_response();
    }

    let grant = form
        .get("code")
        .and_then(|code| ledger.grants.remove(code));
    match grant {
        Some(Grant::Token(access_token)) => Json(json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": 7200,
        }))
        .into_response(),
        Some(Grant::Raw(body)) => {
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        None => (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" })))
            .into_response(),
    }
}

async fn profile(State(ledger): State<Arc<Mutex<Ledger>>>, headers: HeaderMap) -> Response {
    let mut ledger = ledger.lock();
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let Some(bearer) = bearer else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    ledger.profile_bearers.push(bearer.clone());

    if ledger.rejected.contains(&bearer) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match ledger.profiles.get(&bearer) {
        Some(body) => ([(header::CONTENT_TYPE, "application/json")], body.clone()).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}
