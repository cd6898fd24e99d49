#![doc = include_str!("../README.md")]

pub mod csrf;
pub mod error;
pub mod memory;
pub mod middleware;
pub mod oauth;
pub mod posts;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenient access
pub use error::Error;
pub use middleware::{
    AuthConfig, AuthUser, LoginError, Session, SessionAuthenticator, SessionStore, UserStore,
};
pub use oauth::{AccessToken, AuthClient, AuthorizationRequest, ExternalProfile, OAuthConfig};
pub use server::ServerConfig;
pub use types::{ExternalId, PostId, SessionId, ThreadId, UserId};
