use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use super::authenticator::{CallbackParams, SessionAuthenticator};
use super::config::AuthConfig;
use super::cookies;
use super::state::AuthState;
use super::traits::{SessionStore, UserStore};
use super::types::ClientMeta;
use crate::types::SessionId;

/// Create the login router: `{auth_path}/login`, `/callback`, `/logout` and the
/// failure page at `/error`.
pub fn auth_routes<U, S>(config: AuthConfig, users: Arc<U>, sessions: Arc<S>) -> Router
where
    U: UserStore,
    S: SessionStore,
{
    let auth_path = config.settings.auth_path.clone();
    let gate = config.session_gate(sessions.clone());

    let state = AuthState {
        authenticator: Arc::new(SessionAuthenticator::new(config.client, users, sessions)),
        gate,
        settings: config.settings,
    };

    Router::new()
        .route(&format!("{auth_path}/login"), get(login::<U, S>))
        .route(&format!("{auth_path}/callback"), get(callback::<U, S>))
        .route(
            &format!("{auth_path}/logout"),
            get(logout::<U, S>).post(logout::<U, S>),
        )
        .route(&format!("{auth_path}/error"), get(login_failed))
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<U: UserStore, S: SessionStore>(
    State(state): State<AuthState<U, S>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    let auth_req = state.authenticator.begin_login();

    let state_cookie = cookies::state_cookie(
        &auth_req.state,
        state.settings.secure_cookies,
        &state.settings.auth_path,
    );

    (jar.add(state_cookie), Redirect::to(&auth_req.url))
}

// ── Callback ───────────────────────────────────────────────────────

async fn callback<U: UserStore, S: SessionStore>(
    State(state): State<AuthState<U, S>>,
    jar: PrivateCookieJar,
    query: Result<Query<CallbackParams>, QueryRejection>,
    headers: HeaderMap,
) -> Result<(PrivateCookieJar, Redirect), Response> {
    // An unparseable query carries no usable code.
    let params = query.map_or_else(
        |rejection| {
            tracing::warn!(error = %rejection, "Malformed OAuth2 callback query");
            CallbackParams::default()
        },
        |Query(params)| params,
    );
    let expected_state = cookies::get_state(&jar);
    let meta = ClientMeta {
        user_agent: extract_user_agent(&headers),
        ip_address: extract_client_ip(&headers),
    };

    let session = state
        .authenticator
        .complete_login(params, expected_state.as_deref(), meta)
        .await
        .map_err(|e| login_error(&state.settings.error_redirect(), e.reason()))?;

    let session_cookie = cookies::session_cookie(
        &state.settings.session_cookie_name,
        &session.id.to_string(),
        state.settings.session_ttl_days,
        state.settings.secure_cookies,
    );
    let clear_state = cookies::clear_state_cookie(&state.settings.auth_path);

    let jar = jar.add(session_cookie).add(clear_state);

    Ok((jar, Redirect::to(&state.settings.login_redirect)))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<U: UserStore, S: SessionStore>(
    State(state): State<AuthState<U, S>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Html<&'static str>) {
    if let Some(cookie) = jar.get(&state.settings.session_cookie_name) {
        let session_id = SessionId(cookie.value().to_string());
        state.authenticator.logout(&session_id).await;
    }

    let clear_cookie = cookies::clear_session_cookie(&state.settings.session_cookie_name);
    (jar.remove(clear_cookie), Html("<p>Logged out.</p>"))
}

// ── Failure page ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct FailureQuery {
    error: Option<String>,
}

async fn login_failed(query: Result<Query<FailureQuery>, QueryRejection>) -> Html<String> {
    let reason = query
        .ok()
        .and_then(|Query(q)| q.error)
        .filter(|r| !r.is_empty() && r.bytes().all(|b| b.is_ascii_lowercase() || b == b'_'))
        .unwrap_or_else(|| "unknown".into());
    Html(format!("<p>Login failed ({reason}).</p>"))
}

// ── Helpers ────────────────────────────────────────────────────────

fn login_error(error_redirect: &str, code: &str) -> Response {
    let encoded = urlencoding::encode(code);
    Redirect::to(&format!("{error_redirect}?error={encoded}")).into_response()
}

fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
}
