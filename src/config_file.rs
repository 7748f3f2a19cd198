//! Configuration file support
//!
//! Loads server configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{FeedConfig, ServerConfig};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Upstream feed settings
    pub feed: Option<FeedSettings>,
    /// Error reporting settings
    pub errors: Option<ErrorSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Route prefix, e.g. "/v2v"
    pub mount_prefix: Option<String>,
    /// Per-request deadline in seconds
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Upstream fetch timeout in seconds
    pub fetch_timeout_secs: Option<u64>,
    /// User-Agent header for upstream requests
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSettings {
    /// Answer every failure with 500 (default); `false` enables per-kind statuses
    pub uniform: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let defaults = ServerConfig::default();
        Self {
            server: ServerSettings {
                host: defaults.host,
                port: defaults.port,
                mount_prefix: Some(defaults.mount_prefix),
                request_timeout_secs: Some(defaults.request_timeout_secs),
            },
            feed: Some(FeedSettings {
                fetch_timeout_secs: Some(defaults.feed.fetch_timeout_secs),
                user_agent: Some(defaults.feed.user_agent),
            }),
            errors: Some(ErrorSettings {
                uniform: defaults.uniform_errors,
            }),
            logging: Some(LoggingSettings {
                level: defaults.log_level,
                format: Some(defaults.log_format),
            }),
        }
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let feed_defaults = FeedConfig::default();
        let feed = self.feed.unwrap_or(FeedSettings {
            fetch_timeout_secs: None,
            user_agent: None,
        });
        let (log_level, log_format) = match self.logging {
            Some(l) => (l.level, l.format.unwrap_or(defaults.log_format)),
            None => (defaults.log_level, defaults.log_format),
        };

        ServerConfig {
            host: self.server.host,
            port: self.server.port,
            mount_prefix: self.server.mount_prefix.unwrap_or(defaults.mount_prefix),
            request_timeout_secs: self
                .server
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            feed: FeedConfig {
                fetch_timeout_secs: feed
                    .fetch_timeout_secs
                    .unwrap_or(feed_defaults.fetch_timeout_secs),
                user_agent: feed.user_agent.unwrap_or(feed_defaults.user_agent),
            },
            uniform_errors: self
                .errors
                .map(|e| e.uniform)
                .unwrap_or(defaults.uniform_errors),
            log_level,
            log_format,
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
