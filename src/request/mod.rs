//! Inbound request model
//!
//! - Route classification (preflight / multivariant / media)
//! - Query parsing into a feed reference and rendition selector
//! - The per-request context carried through the pipeline

pub mod classify;
pub mod selector;

use axum::http::Uri;
use std::fmt;
use tracing::{info_span, warn, Span};
use uuid::Uuid;

use crate::error::{Result, V2vError};

pub use classify::{ManifestKind, Operation, RouteTable};
pub use selector::{audiotrack_splits, FeedRef, ManifestParams, VariantSelector};

/// What a manifest request asks the pipeline to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestTarget {
    Multivariant,
    Media(VariantSelector),
}

impl ManifestTarget {
    pub fn kind(&self) -> ManifestKind {
        match self {
            ManifestTarget::Multivariant => ManifestKind::Multivariant,
            ManifestTarget::Media(_) => ManifestKind::Media,
        }
    }
}

impl fmt::Display for ManifestTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ManifestTarget::Multivariant => write!(f, "multivariant"),
            ManifestTarget::Media(selector) => write!(f, "{} media", selector.media_type()),
        }
    }
}

/// Parsed manifest request. Built fresh per request and dropped once the
/// response is produced.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub feed: FeedRef,
    pub target: ManifestTarget,
    /// Span every pipeline stage logs into
    pub span: Span,
}

impl RequestContext {
    /// Build the context of a manifest operation from the request URI.
    ///
    /// A media request naming neither `audiotrack` nor `bw` is rejected.
    pub fn from_uri(kind: ManifestKind, uri: &Uri) -> Result<Self> {
        let params = ManifestParams::from_uri(uri)?;
        let feed = FeedRef::from_params(&params, uri.query())?;

        let target = match kind {
            ManifestKind::Multivariant => ManifestTarget::Multivariant,
            ManifestKind::Media => match VariantSelector::from_params(&params)? {
                Some(selector) => ManifestTarget::Media(selector),
                None => {
                    warn!(mrss = %feed.uri, "Neither 'audiotrack' nor 'bw' were included in search params");
                    return Err(V2vError::MissingSelector);
                }
            },
        };

        let request_id = Uuid::new_v4();
        let selector = match &target {
            ManifestTarget::Media(selector) => selector.to_string(),
            ManifestTarget::Multivariant => String::new(),
        };
        let span = info_span!(
            "v2v_request",
            request_id = %request_id,
            operation = %kind,
            selector = %selector,
            mrss = %feed.uri,
        );

        Ok(Self {
            request_id,
            feed,
            target,
            span,
        })
    }
}
