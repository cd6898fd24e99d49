use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::authenticator::SessionAuthenticator;
use super::config::AuthSettings;
use super::extractor::SessionGate;

/// Shared state for auth route handlers.
pub(super) struct AuthState<U, S> {
    pub(super) authenticator: Arc<SessionAuthenticator<U, S>>,
    pub(super) gate: SessionGate,
    pub(super) settings: AuthSettings,
}

// Manual Clone: avoid derive adding `U: Clone, S: Clone` bounds.
impl<U, S> Clone for AuthState<U, S> {
    fn clone(&self) -> Self {
        Self {
            authenticator: self.authenticator.clone(),
            gate: self.gate.clone(),
            settings: self.settings.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<U, S> FromRef<AuthState<U, S>> for Key {
    fn from_ref(state: &AuthState<U, S>) -> Self {
        state.settings.cookie_key.clone()
    }
}

impl<U, S> FromRef<AuthState<U, S>> for SessionGate {
    fn from_ref(state: &AuthState<U, S>) -> Self {
        state.gate.clone()
    }
}
