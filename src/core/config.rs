//! Configuration management for plugin-index.
//!
//! Handles loading configuration from TOML files. Every field has a default,
//! so an empty or missing file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::retry::RetryPolicy;

/// Local configuration file name, looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".plugin-index.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub endpoints
    pub github: GitHubConfig,

    /// Retry and throttling settings for API calls
    pub retry: RetryConfig,

    /// Index generation settings
    pub index: IndexConfig,

    /// URL shortener settings
    pub shortener: ShortenerConfig,
}

/// GitHub endpoints and client identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// REST API base URL
    pub api_base: String,

    /// Public site base URL, used for project and author links
    pub site_base: String,

    /// User agent sent with every request
    pub user_agent: String,
}

/// Retry settings, in milliseconds where a duration is expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_delay_ms: u64,

    /// Upper bound for a single backoff delay
    pub max_delay_ms: u64,

    /// Backoff multiplier
    pub backoff_multiplier: f64,

    /// Add up to 25% jitter to backoff delays
    pub jitter: bool,

    /// Courtesy delay before every request
    pub throttle_ms: u64,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Minimum wait after a rate-limit response, in seconds
    pub rate_limit_floor_secs: u64,

    /// Consecutive rate-limit waits before giving up
    pub max_rate_limit_waits: u32,
}

/// Index generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Listing configuration file
    pub listing: PathBuf,

    /// Canonical output file
    pub output: PathBuf,

    /// Generated summary document
    pub readme: PathBuf,

    /// Static footer appended to the summary document
    pub footer: PathBuf,

    /// The single accepted plugin metadata version
    pub metadata_version: i64,

    /// Minimum host version forced onto view-only plugins
    pub view_only_min_version: i64,

    /// Maximum host version used when a plugin declares none
    pub max_version_sentinel: i64,

    /// Long descriptions shorter than this are replaced by the README
    pub min_long_description: usize,
}

/// URL shortener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortenerConfig {
    /// Shortener endpoint; `URL_SHORTENER` takes precedence when set
    pub endpoint: Option<String>,

    /// CDN prefix sent with each request
    pub cdn_prefix: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.plugin-index.toml` in current directory
    /// 2. `~/.config/plugin-index/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("plugin-index"))
    }

    /// Build the retry policy used by the GitHub client.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }

    /// Resolve the shortener endpoint, preferring the environment.
    pub fn shortener_endpoint(&self) -> Option<String> {
        std::env::var("URL_SHORTENER")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.shortener.endpoint.clone())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            jitter: config.jitter,
            throttle: Duration::from_millis(config.throttle_ms),
            attempt_timeout: Duration::from_secs(config.timeout_secs),
            rate_limit_floor: Duration::from_secs(config.rate_limit_floor_secs),
            max_rate_limit_waits: config.max_rate_limit_waits,
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            site_base: "https://github.com".to_string(),
            user_agent: format!("{}/{}", crate::APP_NAME, crate::VERSION),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            backoff_multiplier: 2.0,
            jitter: false,
            throttle_ms: 100,
            timeout_secs: 30,
            rate_limit_floor_secs: 60,
            max_rate_limit_waits: 10,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            listing: PathBuf::from("listing.json"),
            output: PathBuf::from("plugins.json"),
            readme: PathBuf::from("README.md"),
            footer: PathBuf::from("INFO"),
            metadata_version: 2,
            view_only_min_version: 6135,
            max_version_sentinel: 999_999,
            min_long_description: 100,
        }
    }
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self { endpoint: None, cdn_prefix: "v35.us".to_string(), timeout_secs: 10 }
    }
}
