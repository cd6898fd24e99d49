use serde::{Deserialize, Serialize};

use crate::oauth::ExternalProfile;
use crate::types::{ExternalId, SessionId, UserId};

/// Provider-owned user fields written on every login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileAttributes {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl From<&ExternalProfile> for ProfileAttributes {
    fn from(profile: &ExternalProfile) -> Self {
        Self {
            name: profile.display_name(),
            email: profile.email.clone(),
        }
    }
}

/// Local user record, as returned by [`UserStore::upsert_by_external_id`](super::UserStore::upsert_by_external_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub external_id: ExternalId,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Session data from a completed login.
///
/// Passed to [`SessionStore::establish`](super::SessionStore::establish) for the consumer to persist.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: UserId,
    pub external_id: ExternalId,
    /// Client `User-Agent` header value.
    pub user_agent: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
}

/// An established login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub external_id: ExternalId,
}

/// Request metadata recorded alongside a new session.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}
