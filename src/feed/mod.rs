//! MRSS feed resolution
//!
//! Turns a feed URI into the ordered list of VOD assets to stitch:
//! - HTTP fetch of the Atom-style MRSS document
//! - Parsing of `feed/entry` elements into playlist entries

pub mod parser;
pub mod resolver;

use url::Url;

pub use parser::parse_feed;
pub use resolver::{build_http_client, FeedResolver};

/// One source asset contributed by the feed.
///
/// Entries keep the feed's document order; stitching order is that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    /// Opaque identifier from the feed, never empty
    pub id: String,
    /// Absolute locator of the asset's HLS manifest
    pub uri: Url,
    /// Optional human-readable label
    pub title: Option<String>,
}
