use std::sync::Arc;
use std::time::Duration;

use axum_extra::extract::cookie::Key;
use url::Url;

use super::error::AuthError;
use super::extractor::SessionGate;
use super::traits::SessionStore;
use crate::oauth::{AuthClient, OAuthConfig};
use crate::server::ServerConfig;

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl_days: i64,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) login_redirect: String,
    /// `None` means the built-in page at `{auth_path}/error`.
    pub(crate) error_redirect: Option<String>,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__hs_session".into(),
            session_ttl_days: 30,
            secure_cookies: true,
            auth_path: "/auth".into(),
            login_redirect: "/".into(),
            error_redirect: None,
        }
    }

    pub(crate) fn error_redirect(&self) -> String {
        self.error_redirect
            .clone()
            .unwrap_or_else(|| format!("{}/error", self.auth_path))
    }
}

/// Login flow configuration.
///
/// Required field (`client`) is a constructor parameter, so there are no runtime "missing field" errors.
///
/// Use [`from_env()`](AuthConfig::from_env) for convention-based setup,
/// or [`new()`](AuthConfig::new) with `with_*` methods for full control.
pub struct AuthConfig {
    pub(super) client: AuthClient,
    pub(super) settings: AuthSettings,
}

impl AuthConfig {
    #[must_use]
    pub fn new(client: AuthClient) -> Self {
        Self {
            client,
            settings: AuthSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `OAUTH_CLIENT_ID`, `OAUTH_CLIENT_SECRET`: provider client credentials
    /// - `OAUTH_REDIRECT_URI`: callback URI (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `OAUTH_HOST`: provider base URL; derives all three endpoints
    /// - `OAUTH_AUTH_URL`, `OAUTH_TOKEN_URL`, `OAUTH_PROFILE_URL`: per-endpoint overrides
    /// - `OAUTH_SCOPES`: comma-separated scopes
    /// - `OAUTH_TIMEOUT_SECS`: provider request timeout
    /// - `DEV_AUTH`: `"1"` or `"true"` disables secure cookies (plain-HTTP development)
    /// - `COOKIE_KEY`: cookie encryption key bytes
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing or values are invalid.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// [`from_env`](Self::from_env) with an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let required = |name: &str| {
            var(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AuthError::Config(format!("{name} is required")))
        };
        let url = |name: &str, value: String| {
            value
                .parse::<Url>()
                .map_err(|e| AuthError::Config(format!("{name}: {e}")))
        };

        let client_id = required("OAUTH_CLIENT_ID")?;
        let client_secret = required("OAUTH_CLIENT_SECRET")?;
        let redirect_uri = url("OAUTH_REDIRECT_URI", required("OAUTH_REDIRECT_URI")?)?;

        let mut config = OAuthConfig::new(client_id, client_secret, redirect_uri)?;

        if let Some(host) = var("OAUTH_HOST") {
            config = config.with_host(&url("OAUTH_HOST", host)?)?;
        }
        if let Some(value) = var("OAUTH_AUTH_URL") {
            config = config.with_auth_url(url("OAUTH_AUTH_URL", value)?);
        }
        if let Some(value) = var("OAUTH_TOKEN_URL") {
            config = config.with_token_url(url("OAUTH_TOKEN_URL", value)?);
        }
        if let Some(value) = var("OAUTH_PROFILE_URL") {
            config = config.with_profile_url(url("OAUTH_PROFILE_URL", value)?);
        }
        if let Some(scopes) = var("OAUTH_SCOPES") {
            config = config.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }
        if let Some(secs) = var("OAUTH_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| {
                    AuthError::Config("OAUTH_TIMEOUT_SECS must be a positive integer".into())
                })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        let dev_auth = matches!(var("DEV_AUTH").as_deref(), Some("1") | Some("true"));

        let cookie_key = match var("COOKIE_KEY") {
            Some(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?,
            None => Key::generate(),
        };

        Ok(Self::new(AuthClient::new(config)?)
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!dev_auth))
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.session_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    /// Where failed logins land, with `?error=<reason>` appended.
    /// Defaults to the page served at `{auth_path}/error`.
    #[must_use]
    pub fn with_error_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.error_redirect = Some(path.into());
        self
    }

    /// Apply process-level policy: production always gets secure cookies, whatever
    /// `DEV_AUTH` says.
    #[must_use]
    pub fn for_server(mut self, server: &ServerConfig) -> Self {
        if server.is_production() && !self.settings.secure_cookies {
            tracing::warn!("Insecure cookies requested in production; keeping them secure");
            self.settings.secure_cookies = true;
        }
        self
    }

    #[must_use]
    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    /// Session lookup sharing this config's cookie name and key.
    ///
    /// Hand it to other routers (e.g. [`post_routes`](crate::posts::post_routes)) so their
    /// handlers can use the [`AuthUser`](super::AuthUser) extractor.
    #[must_use]
    pub fn session_gate<S: SessionStore>(&self, sessions: Arc<S>) -> SessionGate {
        SessionGate::new(
            sessions,
            &self.settings.session_cookie_name,
            self.settings.cookie_key.clone(),
        )
    }
}
