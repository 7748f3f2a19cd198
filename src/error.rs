use std::time::Duration;

use thiserror::Error;

/// Main error type for the stitching service
#[derive(Error, Debug)]
pub enum V2vError {
    #[error("Missing required query parameter 'mrss'")]
    MissingFeedUri,

    #[error("Invalid MRSS URI: {0}")]
    InvalidFeedUri(String),

    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    #[error("Failed to fetch MRSS: {status}:{status_text}")]
    FeedStatus { status: u16, status_text: String },

    #[error("Failed to fetch MRSS: {0}")]
    FeedUnreachable(String),

    #[error("Failed to parse MRSS: {0}")]
    FeedParse(String),

    #[error("Neither 'audiotrack' nor 'bw' were included in search params")]
    MissingSelector,

    #[error("Malformed audiotrack '{0}', expected <groupId>-<language>")]
    MalformedSelector(String),

    #[error("Stitching failed: {0}")]
    Stitch(String),

    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("No route for {method} {path}")]
    RouteNotFound { method: String, path: String },
}

/// Coarse classification of a [`V2vError`], used for status mapping and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    FeedFetch,
    FeedParse,
    MalformedSelector,
    Stitch,
    VariantNotFound,
    Timeout,
    RouteNotFound,
}

impl V2vError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            V2vError::MissingFeedUri
            | V2vError::InvalidFeedUri(_)
            | V2vError::InvalidQuery(_)
            | V2vError::MissingSelector => ErrorKind::BadRequest,
            V2vError::FeedStatus { .. } | V2vError::FeedUnreachable(_) => ErrorKind::FeedFetch,
            V2vError::FeedParse(_) => ErrorKind::FeedParse,
            V2vError::MalformedSelector(_) => ErrorKind::MalformedSelector,
            V2vError::Stitch(_) => ErrorKind::Stitch,
            V2vError::VariantNotFound(_) => ErrorKind::VariantNotFound,
            V2vError::Timeout(_) => ErrorKind::Timeout,
            V2vError::RouteNotFound { .. } => ErrorKind::RouteNotFound,
        }
    }
}

impl From<reqwest::Error> for V2vError {
    fn from(err: reqwest::Error) -> Self {
        V2vError::FeedUnreachable(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, V2vError>;
