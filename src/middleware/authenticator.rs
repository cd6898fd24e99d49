use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::traits::{SessionStore, StoreError, UserStore};
use super::types::{ClientMeta, NewSession, ProfileAttributes, Session};
use crate::error::Error;
use crate::oauth::{AuthClient, AuthorizationRequest};
use crate::types::SessionId;

/// Query parameters the provider sends to the callback endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Where a login attempt stood when it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    AwaitingCallback,
    TokenExchange,
    ProfileFetch,
    UserResolution,
    SessionEstablishment,
}

/// Terminal failure of one login attempt. None of them is retried.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// Callback carried no `code`: malformed redirect or provider-side denial.
    #[error("Callback is missing the authorization code")]
    MissingCode { detail: CallbackParams },

    #[error("Callback state does not match the login request")]
    StateMismatch,

    #[error("Token exchange failed: {0}")]
    TokenExchange(#[source] Error),

    #[error("Profile fetch failed: {0}")]
    ProfileFetch(#[source] Error),

    #[error("Profile could not be parsed: {0}")]
    ProfileParse(#[source] Error),

    #[error("User resolution failed: {0}")]
    UserResolution(#[source] StoreError),

    #[error("Session could not be established: {0}")]
    SessionEstablishment(#[source] StoreError),
}

impl LoginError {
    /// Stable reason code shown to the user on the error page.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingCode { .. } => "missing_code",
            Self::StateMismatch => "state_mismatch",
            Self::TokenExchange(_) => "token_exchange_failed",
            Self::ProfileFetch(_) => "profile_fetch_failed",
            Self::ProfileParse(_) => "profile_parse_failed",
            Self::UserResolution(_) => "user_resolution_failed",
            Self::SessionEstablishment(_) => "session_failed",
        }
    }

    /// The step that was in progress when the attempt failed.
    #[must_use]
    pub fn stage(&self) -> LoginStage {
        match self {
            Self::MissingCode { .. } | Self::StateMismatch => LoginStage::AwaitingCallback,
            Self::TokenExchange(_) => LoginStage::TokenExchange,
            Self::ProfileFetch(_) | Self::ProfileParse(_) => LoginStage::ProfileFetch,
            Self::UserResolution(_) => LoginStage::UserResolution,
            Self::SessionEstablishment(_) => LoginStage::SessionEstablishment,
        }
    }
}

/// `OAuth2` authorization-code login against one identity provider.
///
/// Holds the provider client and the two stores; no process-wide state. A [`Session`]
/// is only ever returned after all steps of [`complete_login`](Self::complete_login)
/// succeeded.
pub struct SessionAuthenticator<U, S> {
    client: AuthClient,
    users: Arc<U>,
    sessions: Arc<S>,
}

impl<U: UserStore, S: SessionStore> SessionAuthenticator<U, S> {
    #[must_use]
    pub fn new(client: AuthClient, users: Arc<U>, sessions: Arc<S>) -> Self {
        Self {
            client,
            users,
            sessions,
        }
    }

    #[must_use]
    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    /// Provider authorization URL for a new attempt. Keep `state` for the callback.
    #[must_use]
    pub fn begin_login(&self) -> AuthorizationRequest {
        self.client.authorization_url()
    }

    /// Finish an attempt from the callback query.
    ///
    /// `expected_state` is the `state` issued by [`begin_login`](Self::begin_login);
    /// `None` means the attempt is unknown and is treated as a mismatch.
    ///
    /// # Errors
    ///
    /// One [`LoginError`] per failed step; see its variants.
    pub async fn complete_login(
        &self,
        params: CallbackParams,
        expected_state: Option<&str>,
        meta: ClientMeta,
    ) -> Result<Session, LoginError> {
        let Some(code) = params.code.as_deref() else {
            tracing::warn!(
                error = params.error.as_deref().unwrap_or("none"),
                description = params.error_description.as_deref().unwrap_or(""),
                "OAuth2 callback without code"
            );
            return Err(LoginError::MissingCode { detail: params });
        };

        match (params.state.as_deref(), expected_state) {
            (Some(received), Some(expected)) if received == expected => {}
            _ => {
                tracing::warn!("OAuth state mismatch");
                return Err(LoginError::StateMismatch);
            }
        }

        let token = self.client.exchange_code(code).await.map_err(|e| {
            tracing::error!(error = %e, "Token exchange failed");
            LoginError::TokenExchange(e)
        })?;

        let profile = self.client.get_profile(&token).await.map_err(|e| {
            tracing::error!(error = %e, "Profile request failed");
            if matches!(e, Error::Parse { .. }) {
                LoginError::ProfileParse(e)
            } else {
                LoginError::ProfileFetch(e)
            }
        })?;

        let user = self
            .users
            .upsert_by_external_id(&profile.id, &ProfileAttributes::from(&profile))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, external_id = %profile.id, "User resolution failed");
                LoginError::UserResolution(e)
            })?;

        let new_session = NewSession {
            user_id: user.id.clone(),
            external_id: user.external_id.clone(),
            user_agent: meta.user_agent,
            ip_address: meta.ip_address,
        };
        let session_id = self.sessions.establish(new_session).await.map_err(|e| {
            tracing::error!(error = %e, "Session creation failed");
            LoginError::SessionEstablishment(e)
        })?;

        tracing::info!(session_id = %session_id, user_id = %user.id, "OAuth2 login successful");

        Ok(Session {
            id: session_id,
            user_id: user.id,
            external_id: user.external_id,
        })
    }

    /// Destroy a session. Never fails; store errors are logged.
    pub async fn logout(&self, session_id: &SessionId) {
        if let Err(e) = self.sessions.destroy(session_id).await {
            tracing::warn!(error = %e, "Session deletion failed during logout");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::memory::{MemorySessionStore, MemoryUserStore};
    use crate::middleware::User;
    use crate::test_support::FakeProvider;
    use crate::types::ExternalId;

    fn callback(code: &str, state: &str) -> CallbackParams {
        CallbackParams {
            code: Some(code.into()),
            state: Some(state.into()),
            ..CallbackParams::default()
        }
    }

    async fn setup() -> (
        FakeProvider,
        SessionAuthenticator<MemoryUserStore, MemorySessionStore>,
        Arc<MemoryUserStore>,
        Arc<MemorySessionStore>,
    ) {
        let provider = FakeProvider::start().await;
        let users = Arc::new(MemoryUserStore::new());
        let sessions = Arc::new(MemorySessionStore::new());
        let authenticator =
            SessionAuthenticator::new(provider.client(), users.clone(), sessions.clone());
        (provider, authenticator, users, sessions)
    }

    #[tokio::test]
    async fn end_to_end_creates_user_and_session() {
        let (provider, auth, users, sessions) = setup().await;
        provider.issue_code("abc123", "tok_xyz", r#"{"id":"ext_42","name":"Ada","email":"ada@example.com"}"#);

        let session = auth
            .complete_login(callback("abc123", "s1"), Some("s1"), ClientMeta::default())
            .await
            .unwrap();

        let ext: ExternalId = "ext_42".parse().unwrap();
        let user = users.get(&ext).unwrap();
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(session.user_id, user.id);
        assert_eq!(session.external_id, ext);
        assert_eq!(sessions.find(&session.id).await.unwrap(), Some(session.clone()));
        assert_eq!(provider.profile_bearers(), vec!["tok_xyz".to_string()]);
        assert_eq!(
            provider.token_redirect_uris(),
            vec![auth.client().config().redirect_uri().to_string()]
        );
    }

    #[tokio::test]
    async fn missing_code_never_calls_token_endpoint() {
        let (provider, auth, _, sessions) = setup().await;

        for params in [
            CallbackParams::default(),
            CallbackParams {
                state: Some("s1".into()),
                ..CallbackParams::default()
            },
            CallbackParams {
                error: Some("access_denied".into()),
                error_description: Some("User said no".into()),
                state: Some("s1".into()),
                ..CallbackParams::default()
            },
        ] {
            let err = auth
                .complete_login(params.clone(), Some("s1"), ClientMeta::default())
                .await
                .unwrap_err();
            assert_eq!(err.reason(), "missing_code");
            assert_eq!(err.stage(), LoginStage::AwaitingCallback);
            assert!(matches!(err, LoginError::MissingCode { detail } if detail == params));
        }

        assert_eq!(provider.token_requests(), 0);
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn state_mismatch_stops_before_exchange() {
        let (provider, auth, _, _) = setup().await;
        provider.issue_code("abc123", "tok_xyz", r#"{"id":1}"#);

        let err = auth
            .complete_login(callback("abc123", "forged"), Some("s1"), ClientMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::StateMismatch));

        let err = auth
            .complete_login(callback("abc123", "s1"), None, ClientMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::StateMismatch));
        assert_eq!(provider.token_requests(), 0);
    }

    #[tokio::test]
    async fn reused_code_fails_token_exchange() {
        let (provider, auth, users, sessions) = setup().await;
        provider.issue_code("abc123", "tok_xyz", r#"{"id":"ext_42","name":"Ada"}"#);

        auth.complete_login(callback("abc123", "s1"), Some("s1"), ClientMeta::default())
            .await
            .unwrap();
        let err = auth
            .complete_login(callback("abc123", "s2"), Some("s2"), ClientMeta::default())
            .await
            .unwrap_err();

        assert!(matches!(err, LoginError::TokenExchange(Error::OAuth { status: Some(400), .. })));
        assert_eq!(err.stage(), LoginStage::TokenExchange);
        assert_eq!(users.len(), 1);
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn repeat_login_updates_existing_user() {
        let (provider, auth, users, _) = setup().await;
        provider.issue_code("c1", "t1", r#"{"id":"ext_42","name":"Ada","email":"ada@example.com"}"#);
        provider.issue_code("c2", "t2", r#"{"id":"ext_42","name":"Ada L.","email":"ada@new.example.com"}"#);

        let first = auth
            .complete_login(callback("c1", "s"), Some("s"), ClientMeta::default())
            .await
            .unwrap();
        let second = auth
            .complete_login(callback("c2", "s"), Some("s"), ClientMeta::default())
            .await
            .unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(first.user_id, second.user_id);
        assert_ne!(first.id, second.id);
        let user = users.get(&"ext_42".parse().unwrap()).unwrap();
        assert_eq!(user.name.as_deref(), Some("Ada L."));
        assert_eq!(user.email.as_deref(), Some("ada@new.example.com"));
    }

    #[tokio::test]
    async fn malformed_token_response_is_exchange_error() {
        let (provider, auth, _, _) = setup().await;
        provider.issue_raw_token("abc123", r#"{"token_type":"bearer"}"#);

        let err = auth
            .complete_login(callback("abc123", "s"), Some("s"), ClientMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::TokenExchange(Error::Parse { .. })));
        assert_eq!(provider.profile_bearers().len(), 0);
    }

    #[tokio::test]
    async fn profile_errors_are_tagged() {
        let (provider, auth, users, sessions) = setup().await;
        provider.issue_code("bad-json", "t1", "not json");
        provider.issue_code("no-id", "t2", r#"{"name":"Anonymous"}"#);
        provider.issue_code("revoked", "t3", "");
        provider.reject_bearer("t3");

        for (code, reason) in [
            ("bad-json", "profile_parse_failed"),
            ("no-id", "profile_parse_failed"),
            ("revoked", "profile_fetch_failed"),
        ] {
            let err = auth
                .complete_login(callback(code, "s"), Some("s"), ClientMeta::default())
                .await
                .unwrap_err();
            assert_eq!(err.reason(), reason, "code {code}");
            assert_eq!(err.stage(), LoginStage::ProfileFetch);
        }
        assert!(users.is_empty());
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn logout_destroys_and_is_idempotent() {
        let (provider, auth, _, sessions) = setup().await;
        provider.issue_code("abc123", "tok_xyz", r#"{"id":"ext_42"}"#);
        let session = auth
            .complete_login(callback("abc123", "s"), Some("s"), ClientMeta::default())
            .await
            .unwrap();

        auth.logout(&session.id).await;
        auth.logout(&session.id).await;

        assert_eq!(sessions.find(&session.id).await.unwrap(), None);
    }

    struct UnavailableUsers;

    impl UserStore for UnavailableUsers {
        async fn upsert_by_external_id(
            &self,
            _external_id: &ExternalId,
            _attributes: &ProfileAttributes,
        ) -> Result<User, StoreError> {
            Err("users table unavailable".into())
        }
    }

    struct UnavailableSessions;

    impl SessionStore for UnavailableSessions {
        async fn establish(&self, _session: NewSession) -> Result<SessionId, StoreError> {
            Err("sessions table unavailable".into())
        }

        async fn find(&self, _session_id: &SessionId) -> Result<Option<Session>, StoreError> {
            Ok(None)
        }

        async fn destroy(&self, _session_id: &SessionId) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn store_failures_report_the_step_in_progress() {
        let provider = FakeProvider::start().await;
        provider.issue_code("c1", "t1", r#"{"id":"ext_42"}"#);
        provider.issue_code("c2", "t2", r#"{"id":"ext_42"}"#);

        let auth = SessionAuthenticator::new(
            provider.client(),
            Arc::new(UnavailableUsers),
            Arc::new(MemorySessionStore::new()),
        );
        let err = auth
            .complete_login(callback("c1", "s"), Some("s"), ClientMeta::default())
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "user_resolution_failed");
        assert_eq!(err.stage(), LoginStage::UserResolution);

        let users = Arc::new(MemoryUserStore::new());
        let auth = SessionAuthenticator::new(
            provider.client(),
            users.clone(),
            Arc::new(UnavailableSessions),
        );
        let err = auth
            .complete_login(callback("c2", "s"), Some("s"), ClientMeta::default())
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "session_failed");
        assert_eq!(err.stage(), LoginStage::SessionEstablishment);
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn unresponsive_token_endpoint_times_out() {
        let provider = FakeProvider::start().await;
        provider.stall_token_endpoint();
        let config = provider.config().with_timeout(Duration::from_millis(200));

        // A caller-supplied client without its own timeout is still bounded.
        let client = AuthClient::new(config)
            .unwrap()
            .with_http_client(reqwest::Client::new());
        let auth = SessionAuthenticator::new(
            client,
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemorySessionStore::new()),
        );

        let err = auth
            .complete_login(callback("abc123", "s"), Some("s"), ClientMeta::default())
            .await
            .unwrap_err();
        assert!(
            matches!(&err, LoginError::TokenExchange(Error::Http(e)) if e.is_timeout()),
            "{err:?}"
        );
        assert_eq!(err.stage(), LoginStage::TokenExchange);
    }

    #[test]
    fn begin_login_points_at_provider() {
        let config = crate::oauth::OAuthConfig::new(
            "id",
            "secret",
            "https://app.example.com/auth/callback".parse().unwrap(),
        )
        .unwrap();
        let auth = SessionAuthenticator::new(
            AuthClient::new(config).unwrap(),
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemorySessionStore::new()),
        );

        let req = auth.begin_login();
        assert!(req.url.starts_with("https://www.hackerschool.com/oauth/authorize?"));
        assert!(req.url.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fauth%2Fcallback"));
        assert!(req.url.contains(&format!("state={}", req.state)));
    }
}
