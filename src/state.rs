//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Server configuration
//! - Route table for the mount prefix
//! - The manifest orchestrator (feed resolver + stitch engine)
//! - Request counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::ErrorKind;
use crate::feed::{build_http_client, FeedResolver};
use crate::http::response::StatusPolicy;
use crate::orchestrator::ManifestOrchestrator;
use crate::request::{ManifestKind, Operation, RouteTable};
use crate::stitch::{ConcatEngine, StitchEngine};

/// Request counters, reported by `/debug/stats`
#[derive(Debug, Default)]
pub struct RequestStats {
    pub preflight: AtomicU64,
    pub multivariant: AtomicU64,
    pub media: AtomicU64,
    pub unrouted: AtomicU64,
    pub bad_request: AtomicU64,
    pub feed_errors: AtomicU64,
    pub stitch_errors: AtomicU64,
    pub variant_not_found: AtomicU64,
    pub timeouts: AtomicU64,
}

impl RequestStats {
    pub fn record_operation(&self, operation: Operation) {
        let counter = match operation {
            Operation::Preflight => &self.preflight,
            Operation::Manifest(ManifestKind::Multivariant) => &self.multivariant,
            Operation::Manifest(ManifestKind::Media) => &self.media,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::BadRequest | ErrorKind::MalformedSelector => &self.bad_request,
            ErrorKind::FeedFetch | ErrorKind::FeedParse => &self.feed_errors,
            ErrorKind::Stitch => &self.stitch_errors,
            ErrorKind::VariantNotFound => &self.variant_not_found,
            ErrorKind::Timeout => &self.timeouts,
            ErrorKind::RouteNotFound => &self.unrouted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn to_json(&self) -> serde_json::Value {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        serde_json::json!({
            "requests": {
                "preflight": get(&self.preflight),
                "multivariant": get(&self.multivariant),
                "media": get(&self.media),
                "unrouted": get(&self.unrouted),
            },
            "failures": {
                "bad_request": get(&self.bad_request),
                "feed": get(&self.feed_errors),
                "stitch": get(&self.stitch_errors),
                "variant_not_found": get(&self.variant_not_found),
                "timeout": get(&self.timeouts),
            },
        })
    }
}

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    pub routes: RouteTable,
    pub orchestrator: ManifestOrchestrator,
    pub status_policy: StatusPolicy,
    pub stats: RequestStats,
}

impl AppState {
    /// Create state using the bundled concatenating stitch engine.
    pub fn new(config: ServerConfig) -> reqwest::Result<Self> {
        let client = build_http_client(&config.feed)?;
        let engine = Arc::new(ConcatEngine::new(client.clone()));
        Ok(Self::with_engine(config, client, engine))
    }

    /// Create state around a specific stitch engine.
    pub fn with_engine(
        config: ServerConfig,
        client: reqwest::Client,
        engine: Arc<dyn StitchEngine>,
    ) -> Self {
        let orchestrator = ManifestOrchestrator::new(
            FeedResolver::new(client),
            engine,
            config.request_timeout(),
        );
        Self {
            routes: RouteTable::new(&config.mount_prefix),
            status_policy: StatusPolicy::from_config(config.uniform_errors),
            orchestrator,
            stats: RequestStats::default(),
            config,
        }
    }
}
