//! Axum extractor that authenticates the request and yields its subject.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    response::Response,
};
use common::ServiceError;
use tracing::warn;

use super::token::{AuthError, TokenVerifier};
use crate::server::handlers::error_response;

/// The verified subject identifier of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        ServiceError::Unauthorized(err.client_message().into())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<TokenVerifier>::from_ref(state);

        let header = match parts.headers.get(AUTHORIZATION).map(|v| v.to_str()) {
            None => None,
            Some(Ok(value)) => Some(value),
            Some(Err(_)) => return Err(reject(AuthError::MissingOrMalformed)),
        };

        verifier
            .verify_header(header)
            .map(AuthenticatedUser)
            .map_err(reject)
    }
}

fn reject(err: AuthError) -> Response {
    warn!(error = %err, "rejected request credentials");
    error_response(&ServiceError::from(err))
}
