//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with health/version/debug endpoints
//! - A fallback dispatcher for everything under the mount prefix
//! - Response rendering (manifests, preflight, JSON errors)
//! - Request logging middleware

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

pub use routes::create_router;
