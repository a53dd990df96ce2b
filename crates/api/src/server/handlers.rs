//! Axum request handlers for all service endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    ErrorResponse, HealthResponse, MessageResponse, QuoteRequest, UserProfile, UserProfileResponse,
};
use common::ServiceError;
use tracing::{error, info, warn};

use super::state::AppState;
use crate::auth::AuthenticatedUser;
use crate::quote;

/// Render a [`ServiceError`] as its status code and JSON [`ErrorResponse`] body.
pub fn error_response(err: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(err))).into_response()
}

/// `POST /api/save-user` — create or update the caller's profile.
///
/// The profile id is always the token subject. A concurrent first save that
/// loses the insert race answers `200 {"message": "User already exists"}`.
pub async fn save_user(
    State(state): State<AppState>,
    AuthenticatedUser(subject): AuthenticatedUser,
    Json(profile): Json<UserProfile>,
) -> Response {
    match state.store.upsert(&subject, &profile).await {
        Ok(outcome) => {
            info!(?outcome, "profile saved");
            (StatusCode::OK, Json(MessageResponse::new(outcome.message()))).into_response()
        }
        Err(e) => {
            error!(error = %e, "profile upsert failed");
            error_response(&ServiceError::from(e))
        }
    }
}

/// `GET /api/user-profile` — return the caller's stored profile.
pub async fn user_profile(
    State(state): State<AppState>,
    AuthenticatedUser(subject): AuthenticatedUser,
) -> Response {
    match state.store.fetch(&subject).await {
        Ok(Some(record)) => {
            (StatusCode::OK, Json(UserProfileResponse::from(record))).into_response()
        }
        Ok(None) => error_response(&ServiceError::NotFound("User not found".into())),
        Err(e) => {
            error!(error = %e, "profile lookup failed");
            error_response(&ServiceError::from(e))
        }
    }
}

/// `POST /api/calculate-quote` — price a system from query parameters.
pub async fn calculate_quote(
    _user: AuthenticatedUser,
    Query(req): Query<QuoteRequest>,
) -> Response {
    match quote::calculate(&req) {
        Ok(quote) => (StatusCode::OK, Json(quote)).into_response(),
        Err(e) => {
            warn!(error = %e, "quote rejected");
            error_response(&ServiceError::from(e))
        }
    }
}

/// `GET /health` — liveness and readiness check.
///
/// Returns `200 OK` when the database answers a ping, `503` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let database_ready = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "database ping failed");
            false
        }
    };

    let (status_code, status_str) = if database_ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        database_ready,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}
