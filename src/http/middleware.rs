//! HTTP middleware
//!
//! Access logging for every request, tagged with the operation the route
//! table assigns to it.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::state::AppState;

/// Label used for requests outside the mount prefix (health, stats, unknown)
const UNROUTED: &str = "-";

fn operation_label(state: &AppState, request: &Request<Body>) -> String {
    state
        .routes
        .classify(request.method(), request.uri().path())
        .map(|operation| operation.to_string())
        .unwrap_or_else(|| UNROUTED.to_string())
}

/// Request logging middleware
pub async fn request_logger(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let operation = operation_label(&state, &request);
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    if status.is_server_error() {
        error!(%operation, status = status.as_u16(), elapsed_ms, "{} {}", method, path);
    } else if status.is_client_error() {
        warn!(%operation, status = status.as_u16(), elapsed_ms, "{} {}", method, path);
    } else {
        info!(%operation, status = status.as_u16(), elapsed_ms, "{} {}", method, path);
    }

    response
}
