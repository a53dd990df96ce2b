//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::TokenVerifier;
use crate::profile::ProfileStore;

/// Application state shared across all request handlers.
///
/// Both fields are `Arc`s so that Axum can clone the state for each request
/// without copying the pool handle or key material.
#[derive(Clone)]
pub struct AppState {
    /// Profile persistence.
    pub store: Arc<dyn ProfileStore>,
    /// Bearer-token verifier, configured once at startup.
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// Create a new [`AppState`] from a store and verifier.
    pub fn new(store: Arc<dyn ProfileStore>, verifier: TokenVerifier) -> Self {
        Self {
            store,
            verifier: Arc::new(verifier),
        }
    }
}

impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}
