use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Key;

use super::error::AuthError;
use super::traits::{SessionStore, StoreError};
use super::types::Session;
use crate::types::{ExternalId, SessionId, UserId};

/// Authenticated user extracted from the session cookie.
///
/// Use as an Axum extractor in route handlers. Returns `401 Unauthorized`
/// if no valid session exists, including after logout. As `Option<AuthUser>`
/// a missing or dead session becomes `None`; store failures still reject.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected(user: AuthUser) -> impl IntoResponse {
///     format!("Hello, user {}", user.user_id)
/// }
///
/// // Optional: accessible to both authenticated and anonymous users
/// async fn public(user: Option<AuthUser>) -> impl IntoResponse { .. }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub external_id: ExternalId,
}

impl From<Session> for AuthUser {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            user_id: session.user_id,
            external_id: session.external_id,
        }
    }
}

/// Everything needed to turn a request's cookies into an [`AuthUser`].
///
/// Any router state that yields a `SessionGate` via [`FromRef`] can use the
/// `AuthUser` extractor.
#[derive(Clone)]
pub struct SessionGate {
    store: Arc<dyn SessionStoreDyn>,
    cookie_name: Arc<str>,
    key: Key,
}

impl SessionGate {
    pub(crate) fn new<S: SessionStore>(store: Arc<S>, cookie_name: &str, key: Key) -> Self {
        Self {
            store,
            cookie_name: cookie_name.into(),
            key,
        }
    }

    /// Resolve the session named by the private session cookie in `headers`.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`] without a readable cookie,
    /// [`AuthError::SessionExpired`] if the store has no such session,
    /// [`AuthError::Store`] if the lookup fails.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let jar = PrivateCookieJar::from_headers(headers, self.key.clone());

        let session_id = jar
            .get(&self.cookie_name)
            .map(|c| SessionId(c.value().to_string()))
            .ok_or(AuthError::Unauthenticated)?;

        self.store
            .find_dyn(&session_id)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?
            .map(AuthUser::from)
            .ok_or(AuthError::SessionExpired)
    }
}

impl<St> FromRequestParts<St> for AuthUser
where
    St: Send + Sync,
    SessionGate: FromRef<St>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &St) -> Result<Self, Self::Rejection> {
        SessionGate::from_ref(state).resolve(&parts.headers).await
    }
}

impl<St> OptionalFromRequestParts<St> for AuthUser
where
    St: Send + Sync,
    SessionGate: FromRef<St>,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &St,
    ) -> Result<Option<Self>, Self::Rejection> {
        match SessionGate::from_ref(state).resolve(&parts.headers).await {
            Ok(user) => Ok(Some(user)),
            Err(AuthError::Unauthenticated | AuthError::SessionExpired) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe wrapper for SessionStore (needed for Arc<dyn>).
trait SessionStoreDyn: Send + Sync {
    fn find_dyn<'a>(
        &'a self,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, Result<Option<Session>, StoreError>>;
}

impl<T: SessionStore> SessionStoreDyn for T {
    fn find_dyn<'a>(
        &'a self,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, Result<Option<Session>, StoreError>> {
        Box::pin(self.find(session_id))
    }
}
