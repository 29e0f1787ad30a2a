//! HTTP route handlers for Surveyd.

use axum::{
    Router,
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::respond;
use crate::state::AppState;

mod form;
mod health;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Survey submission
        .route(
            "/api/form",
            post(form::submit)
                .options(form::preflight)
                .fallback(form::method_not_allowed),
        )
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        // Unknown paths still get an answered, CORS-carrying response
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        // Add shared state
        .with_state(state)
}

async fn not_found() -> Response {
    respond::json(StatusCode::NOT_FOUND, serde_json::json!({ "error": "not found" }))
}
