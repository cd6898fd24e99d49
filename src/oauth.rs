use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::csrf;
use crate::error::Error;
use crate::types::ExternalId;

const DEFAULT_HOST: &str = "https://www.hackerschool.com";
const AUTHORIZE_PATH: &str = "/oauth/authorize";
const TOKEN_PATH: &str = "/oauth/token";
const PROFILE_PATH: &str = "/api/v1/people/me";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity provider `OAuth2` client configuration.
///
/// Credentials are validated once, here. An `OAuthConfig` that exists always carries a
/// non-empty client id and secret.
///
/// ```rust,ignore
/// use hs_accounts::OAuthConfig;
///
/// let config = OAuthConfig::new("id", "secret", "https://my-app.com/auth/callback".parse()?)?
///     .with_host(&"https://provider.example.com".parse()?)?;
/// ```
#[derive(Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) profile_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
    pub(crate) timeout: Duration,
}

impl OAuthConfig {
    /// Create a configuration pointing at the default provider host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `client_id` or `client_secret` is empty.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
    ) -> Result<Self, Error> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.trim().is_empty() {
            return Err(Error::Config("client id is empty".into()));
        }
        if client_secret.trim().is_empty() {
            return Err(Error::Config("client secret is empty".into()));
        }

        let host: Url = DEFAULT_HOST
            .parse()
            .map_err(|e| Error::Config(format!("default host: {e}")))?;
        let (auth_url, token_url, profile_url) = endpoints_for(&host)?;

        Ok(Self {
            client_id,
            client_secret,
            auth_url,
            token_url,
            profile_url,
            redirect_uri,
            scopes: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Point all three endpoints at another provider host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `host` cannot be a base URL.
    pub fn with_host(mut self, host: &Url) -> Result<Self, Error> {
        let (auth_url, token_url, profile_url) = endpoints_for(host)?;
        self.auth_url = auth_url;
        self.token_url = token_url;
        self.profile_url = profile_url;
        Ok(self)
    }

    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    #[must_use]
    pub fn with_profile_url(mut self, url: Url) -> Self {
        self.profile_url = url;
        self
    }

    /// Request scopes (default: none, the provider's default grant).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Upper bound for each provider request (default: 10 seconds).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    #[must_use]
    pub fn profile_url(&self) -> &Url {
        &self.profile_url
    }

    /// Callback URI sent with both the authorization request and the code exchange.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("profile_url", &self.profile_url.as_str())
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("scopes", &self.scopes)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn endpoints_for(host: &Url) -> Result<(Url, Url, Url), Error> {
    let join = |path: &str| {
        host.join(path)
            .map_err(|e| Error::Config(format!("provider host {host}: {e}")))
    };
    Ok((join(AUTHORIZE_PATH)?, join(TOKEN_PATH)?, join(PROFILE_PATH)?))
}

/// `OAuth2` client for the identity provider.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

/// Authorization URL plus the `state` value to remember until the callback.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// Access token from the token endpoint. Used once, never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Profile document from the provider's profile endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ExternalProfile {
    pub id: ExternalId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ExternalProfile {
    #[must_use]
    pub fn new(id: ExternalId) -> Self {
        Self {
            id,
            name: None,
            first_name: None,
            last_name: None,
            email: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// `name` if present, otherwise `first_name last_name`.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return Some(name.to_string());
        }
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }
}

impl AuthClient {
    /// Create a client whose requests are bounded by the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: OAuthConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    ///
    /// The configured [`timeout`](OAuthConfig::with_timeout) is still applied to every
    /// provider request, whatever the client's own settings.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the provider authorization URL with a fresh `state`.
    #[must_use]
    pub fn authorization_url(&self) -> AuthorizationRequest {
        let state = csrf::generate_state();

        let mut url = self.config.auth_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", self.config.redirect_uri.as_str())
                .append_pair("state", &state);
            if !self.config.scopes.is_empty() {
                query.append_pair("scope", &self.config.scopes.join(" "));
            }
        }

        AuthorizationRequest {
            url: url.into(),
            state,
        }
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// [`Error::Http`] on network failure, [`Error::OAuth`] if the provider rejects the
    /// code, [`Error::Parse`] if the response carries no usable token.
    pub async fn exchange_code(&self, code: &str) -> Result<AccessToken, Error> {
        const OPERATION: &str = "token exchange";

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .timeout(self.config.timeout)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, OPERATION).await?;
        let body = response.text().await?;
        let token: TokenResponse = serde_json::from_str(&body).map_err(|source| Error::Parse {
            operation: OPERATION,
            source,
        })?;
        Ok(AccessToken(token.access_token))
    }

    /// Fetch the authenticated account's profile.
    ///
    /// # Errors
    ///
    /// [`Error::Http`] on network failure, [`Error::OAuth`] on a non-success status,
    /// [`Error::Parse`] if the body is not a profile document.
    pub async fn get_profile(&self, token: &AccessToken) -> Result<ExternalProfile, Error> {
        const OPERATION: &str = "profile request";

        let response = self
            .http
            .get(self.config.profile_url.clone())
            .timeout(self.config.timeout)
            .bearer_auth(token.secret())
            .send()
            .await?;

        let response = Self::ensure_success(response, OPERATION).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| Error::Parse {
            operation: OPERATION,
            source,
        })
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::OAuth {
            operation,
            status: Some(status),
            detail: body,
        })
    }
}
