//! Axum router construction.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// CORS is the outermost layer so preflight requests are answered before
/// routing.
pub fn build(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/save-user", post(handlers::save_user))
        .route("/api/user-profile", get(handlers::user_profile))
        .route("/api/calculate-quote", post(handlers::calculate_quote))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
