//! Response rendering
//!
//! Maps pipeline outcomes onto HTTP responses. Every response carries
//! `Access-Control-Allow-Origin: *`.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{ErrorKind, V2vError};

/// MIME type of HLS manifests
pub const MPEGURL: &str = "application/vnd.apple.mpegurl";

/// How failures are mapped to status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Status derived from the error kind
    Classified,
    /// 500 for every failure
    Uniform,
}

impl StatusPolicy {
    pub fn from_config(uniform_errors: bool) -> Self {
        if uniform_errors {
            StatusPolicy::Uniform
        } else {
            StatusPolicy::Classified
        }
    }

    pub fn status_for(self, kind: ErrorKind) -> StatusCode {
        // An unknown route is never a server failure.
        if kind == ErrorKind::RouteNotFound {
            return StatusCode::NOT_FOUND;
        }
        if self == StatusPolicy::Uniform {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match kind {
            ErrorKind::BadRequest | ErrorKind::MalformedSelector => StatusCode::BAD_REQUEST,
            ErrorKind::FeedFetch | ErrorKind::FeedParse => StatusCode::BAD_GATEWAY,
            ErrorKind::VariantNotFound | ErrorKind::RouteNotFound => StatusCode::NOT_FOUND,
            ErrorKind::Stitch => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    reason: &'a str,
}

/// 204 answer to a CORS preflight request
pub fn preflight_response() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Origin"),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    )
        .into_response()
}

/// 200 with a manifest body
pub fn manifest_response(manifest: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, MPEGURL),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        manifest,
    )
        .into_response()
}

/// JSON error response; the body is empty when there is no message.
pub fn error_response(status: StatusCode, reason: Option<&str>) -> Response {
    let body = match reason {
        Some(reason) => match serde_json::to_string(&ErrorBody { reason }) {
            Ok(json) => Body::from(json),
            Err(_) => Body::empty(),
        },
        None => Body::empty(),
    };

    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

/// Render a pipeline error under the given policy
pub fn render_error(err: &V2vError, policy: StatusPolicy) -> Response {
    let reason = err.to_string();
    error_response(policy.status_for(err.kind()), Some(&reason))
}
