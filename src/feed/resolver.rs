//! Feed fetching
//!
//! Fetches an MRSS document over HTTP and hands it to the parser. No retry
//! is performed here; a non-success status fails the request immediately.

use tracing::{debug, warn};
use url::Url;

use super::{parse_feed, PlaylistEntry};
use crate::config::FeedConfig;
use crate::error::{Result, V2vError};

/// Build the HTTP client shared by the feed resolver and the stitching engine.
pub fn build_http_client(config: &FeedConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.fetch_timeout())
        .user_agent(config.user_agent.clone())
        .build()
}

/// Resolves feed URIs into ordered playlists.
#[derive(Clone)]
pub struct FeedResolver {
    client: reqwest::Client,
}

impl FeedResolver {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fetch and parse the feed at `feed_uri`.
    pub async fn resolve(&self, feed_uri: &Url) -> Result<Vec<PlaylistEntry>> {
        debug!("Fetching -> {}", feed_uri);
        let response = self.client.get(feed_uri.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let err = V2vError::FeedStatus {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
            };
            warn!("{}", err);
            return Err(err);
        }

        let body = response.text().await?;
        let playlist = parse_feed(&body)?;
        debug!(entries = playlist.len(), "Fetched MRSS");
        Ok(playlist)
    }
}
