//! Plug-and-play `OAuth2` login middleware for Axum.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hs_accounts::middleware::{AuthConfig, auth_routes};
//!
//! // 1. Implement UserStore and SessionStore for your app (or use crate::memory)
//! // 2. Configure from environment
//! let config = AuthConfig::from_env()?;
//! let gate = config.session_gate(sessions.clone());
//!
//! // 3. Mount auth routes
//! let app = axum::Router::new().merge(auth_routes(config, users, sessions));
//!
//! // 4. Take `AuthUser` in handlers whose state provides the `SessionGate`
//! ```

mod authenticator;
mod config;
mod cookies;
mod error;
mod extractor;
mod routes;
mod state;
mod traits;
mod types;

pub use authenticator::{CallbackParams, LoginError, LoginStage, SessionAuthenticator};
pub use config::AuthConfig;
pub use error::AuthError;
pub use extractor::{AuthUser, SessionGate};
pub use routes::auth_routes;
pub use traits::{SessionStore, StoreError, UserStore};
pub use types::{ClientMeta, NewSession, ProfileAttributes, Session, User};

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
