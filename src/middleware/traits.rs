use std::future::Future;

use super::types::{NewSession, ProfileAttributes, Session, User};
use crate::types::{ExternalId, SessionId};

/// Error type returned by consumer-provided stores.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer-provided user management.
///
/// Called once per completed login to create or refresh the local user.
///
/// # Example
///
/// ```rust,ignore
/// impl UserStore for Db {
///     async fn upsert_by_external_id(
///         &self,
///         external_id: &ExternalId,
///         attributes: &ProfileAttributes,
///     ) -> Result<User, StoreError> {
///         // INSERT .. ON CONFLICT (external_id) DO UPDATE SET name = .., email = ..
///         self.upsert_user(external_id, attributes).await
///     }
/// }
/// ```
pub trait UserStore: Send + Sync + 'static {
    /// Create the user keyed by `external_id`, or overwrite its provider-owned
    /// fields if it already exists.
    ///
    /// Must be atomic per `external_id`: concurrent logins by the same account
    /// never produce two users.
    fn upsert_by_external_id(
        &self,
        external_id: &ExternalId,
        attributes: &ProfileAttributes,
    ) -> impl Future<Output = Result<User, StoreError>> + Send;
}

/// Consumer-provided session persistence.
///
/// Sessions are identified by opaque [`SessionId`]s chosen by the store.
pub trait SessionStore: Send + Sync + 'static {
    /// Persist a new session. Returns the session ID.
    fn establish(
        &self,
        session: NewSession,
    ) -> impl Future<Output = Result<SessionId, StoreError>> + Send;

    /// Look up a live session by ID.
    fn find(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Option<Session>, StoreError>> + Send;

    /// Delete a session (logout). Deleting an unknown session is not an error.
    fn destroy(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
