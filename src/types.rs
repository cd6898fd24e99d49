use derive_more::{Display, From, FromStr, Into};
use serde::{Deserialize, Serialize};

/// Identity provider account identifier (profile `id`).
///
/// Stable per provider account and the sole join key to local users. Providers send it
/// either as a JSON string or a JSON integer; both normalize to the decimal/text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize, Display, Into)]
#[serde(try_from = "RawExternalId", into = "String")]
pub struct ExternalId(String);

impl ExternalId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for ExternalId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(RawExternalId::Text(s.to_owned()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawExternalId {
    Text(String),
    Number(i64),
}

impl TryFrom<RawExternalId> for ExternalId {
    type Error = String;

    fn try_from(raw: RawExternalId) -> Result<Self, Self::Error> {
        match raw {
            RawExternalId::Number(n) => Ok(Self(n.to_string())),
            RawExternalId::Text(s) if s.trim().is_empty() => {
                Err("external id must not be empty".into())
            }
            RawExternalId::Text(s) => Ok(Self(s)),
        }
    }
}

/// Local user identifier, assigned by the [`UserStore`](crate::middleware::UserStore).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into, FromStr)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Opaque session identifier, assigned by the [`SessionStore`](crate::middleware::SessionStore).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into, FromStr)]
#[serde(transparent)]
pub struct SessionId(pub String);

/// Discussion thread identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into, FromStr,
)]
#[serde(transparent)]
pub struct ThreadId(pub u64);

/// Discussion post identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into, FromStr,
)]
#[serde(transparent)]
pub struct PostId(pub u64);
