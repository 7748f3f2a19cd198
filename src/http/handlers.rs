//! HTTP request handlers
//!
//! `dispatch` is the single entry point for everything below the mount
//! prefix; it classifies the request and runs the matching operation.

use axum::{
    extract::State,
    http::{Method, Uri},
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::response::{manifest_response, preflight_response, render_error};
use crate::error::V2vError;
use crate::request::{ManifestKind, Operation, RequestContext};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("hls-v2v-server v", env!("CARGO_PKG_VERSION"))
}

/// Debug endpoint - request counters
pub async fn request_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut stats = state.stats.to_json();
    stats["mount_prefix"] = serde_json::json!(state.config.mount_prefix);
    stats["uniform_errors"] = serde_json::json!(state.config.uniform_errors);
    Json(stats)
}

/// Classify and handle any request not matched by a fixed route
pub async fn dispatch(State(state): State<Arc<AppState>>, method: Method, uri: Uri) -> Response {
    let Some(operation) = state.routes.classify(&method, uri.path()) else {
        let err = V2vError::RouteNotFound {
            method: method.to_string(),
            path: uri.path().to_string(),
        };
        debug!("{}", err);
        state.stats.record_failure(err.kind());
        return render_error(&err, state.status_policy);
    };
    state.stats.record_operation(operation);

    match operation {
        Operation::Preflight => {
            debug!("Requesting Options...");
            preflight_response()
        }
        Operation::Manifest(kind) => handle_manifest(&state, kind, &uri).await,
    }
}

/// Multivariant and media manifest requests
async fn handle_manifest(state: &AppState, kind: ManifestKind, uri: &Uri) -> Response {
    let ctx = match RequestContext::from_uri(kind, uri) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!("Rejected {} manifest request: {}", kind, err);
            state.stats.record_failure(err.kind());
            return render_error(&err, state.status_policy);
        }
    };

    ctx.span.in_scope(|| info!("Requesting {} manifest", ctx.target));

    match state.orchestrator.handle(&ctx).await {
        Ok(manifest) => manifest_response(manifest),
        Err(err) => {
            ctx.span.in_scope(|| {
                error!(kind = ?err.kind(), "Failed to generate {} manifest: {}", ctx.target, err)
            });
            state.stats.record_failure(err.kind());
            render_error(&err, state.status_policy)
        }
    }
}
