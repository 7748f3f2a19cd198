//! Request classification
//!
//! Maps method + path onto one of the supported operations. Pure; the
//! caller answers unmatched routes with 404.

use axum::http::Method;
use std::fmt;

/// Manifest operations, the ones that run the feed + stitch pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Multivariant,
    Media,
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ManifestKind::Multivariant => write!(f, "multivariant"),
            ManifestKind::Media => write!(f, "media"),
        }
    }
}

/// Operation requested by an inbound HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Preflight,
    Manifest(ManifestKind),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operation::Preflight => write!(f, "preflight"),
            Operation::Manifest(kind) => write!(f, "{}", kind),
        }
    }
}

/// Route table for one mount prefix.
#[derive(Debug, Clone)]
pub struct RouteTable {
    prefix: String,
    master_path: String,
    media_path: String,
}

impl RouteTable {
    /// `prefix` must already be normalized (leading `/`, no trailing `/`).
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            master_path: format!("{}/master.m3u8", prefix),
            media_path: format!("{}/media.m3u8", prefix),
        }
    }

    fn under_prefix(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Classify a request. Preflight is checked first so that OPTIONS on
    /// any sub-path under the prefix is honored.
    pub fn classify(&self, method: &Method, path: &str) -> Option<Operation> {
        if *method == Method::OPTIONS && self.under_prefix(path) {
            Some(Operation::Preflight)
        } else if path == self.master_path {
            Some(Operation::Manifest(ManifestKind::Multivariant))
        } else if path == self.media_path {
            Some(Operation::Manifest(ManifestKind::Media))
        } else {
            None
        }
    }
}
