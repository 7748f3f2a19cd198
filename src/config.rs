//! Server configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upstream feed fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Timeout for a single upstream fetch (feed or asset playlist) in seconds
    pub fetch_timeout_secs: u64,

    /// User-Agent sent with upstream requests
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 10,
            user_agent: concat!("hls-v2v-server/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FeedConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Path prefix all manifest routes are mounted under
    pub mount_prefix: String,

    /// Deadline for a whole manifest request in seconds
    pub request_timeout_secs: u64,

    /// Feed configuration
    pub feed: FeedConfig,

    /// Report every failure as 500; `false` maps each error kind to its own status
    pub uniform_errors: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            mount_prefix: "/v2v".to_string(),
            request_timeout_secs: 30,
            feed: FeedConfig::default(),
            uniform_errors: true,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Path of the multivariant manifest route
    pub fn master_path(&self) -> String {
        format!("{}/master.m3u8", self.mount_prefix)
    }

    /// Path of the media manifest route
    pub fn media_path(&self) -> String {
        format!("{}/media.m3u8", self.mount_prefix)
    }

    /// Check the configuration and normalize the mount prefix.
    pub fn validate(mut self) -> Result<Self, String> {
        let trimmed = self.mount_prefix.trim_end_matches('/');
        if !trimmed.starts_with('/') {
            return Err(format!(
                "mount_prefix must start with '/': {:?}",
                self.mount_prefix
            ));
        }
        self.mount_prefix = trimmed.to_string();

        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than zero".to_string());
        }
        if self.feed.fetch_timeout_secs == 0 {
            return Err("feed.fetch_timeout_secs must be greater than zero".to_string());
        }
        Ok(self)
    }
}
