//! Axum router configuration

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers::{dispatch, health_check, request_stats, version_check};
use super::middleware::request_logger;

/// Create the Axum router with all routes
///
/// Manifest and preflight routes are not registered individually; the
/// fallback classifies them against the configured mount prefix.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health and version endpoints
        .route("/health", get(health_check))
        .route("/version", get(version_check))
        // Debug endpoints
        .route("/debug/stats", get(request_stats))
        // Preflight, multivariant and media manifests
        .fallback(dispatch)
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), request_logger))
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
