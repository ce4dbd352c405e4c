//! Package URL shortening.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::record::PluginRecord;
use crate::core::Config;
use crate::github::Transport;

#[derive(Debug, Deserialize)]
struct ShortenResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url_short: Option<String>,
}

/// Client for the URL shortener service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortener {
    endpoint: String,
    cdn_prefix: String,
    timeout: Duration,
}

impl Shortener {
    pub fn new(
        endpoint: impl Into<String>,
        cdn_prefix: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self { endpoint: endpoint.into(), cdn_prefix: cdn_prefix.into(), timeout }
    }

    /// Build a shortener when an endpoint is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        config.shortener_endpoint().map(|endpoint| {
            Self::new(
                endpoint,
                config.shortener.cdn_prefix.clone(),
                Duration::from_secs(config.shortener.timeout_secs),
            )
        })
    }

    /// Shorten `long_url`; any failure yields `None` with a warning.
    pub fn shorten<T: Transport>(&self, transport: &T, long_url: &str) -> Option<String> {
        let body = json!({"cdn_prefix": self.cdn_prefix, "url_long": long_url});
        let response = match transport.post_json(&self.endpoint, &body, self.timeout) {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to shorten URL {long_url}: {e}");
                return None;
            }
        };

        let parsed: ShortenResponse = match serde_json::from_str(&response.body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Failed to shorten URL {long_url}: {e}");
                return None;
            }
        };

        match (parsed.error.as_deref(), parsed.url_short) {
            (Some(""), Some(short)) if short.starts_with("http") => {
                debug!("Shortened {long_url} to {short}");
                Some(short)
            }
            (error, _) => {
                warn!("Shortener rejected {long_url}: {}", error.unwrap_or("no error field"));
                None
            }
        }
    }
}

/// Known `packageUrl` to `packageShortUrl` pairs.
#[derive(Debug, Clone, Default)]
pub struct ShortUrlCache(HashMap<String, String>);

impl ShortUrlCache {
    /// Collect the pairs already published in an index.
    pub fn from_index(records: &[PluginRecord]) -> Self {
        Self(
            records
                .iter()
                .filter(|record| !record.package_short_url.is_empty())
                .map(|record| (record.package_url.clone(), record.package_short_url.clone()))
                .collect(),
        )
    }

    pub fn get(&self, long_url: &str) -> Option<&str> {
        self.0.get(long_url).map(String::as_str)
    }

    pub fn insert(&mut self, long_url: &str, short_url: &str) {
        self.0.insert(long_url.to_string(), short_url.to_string());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::testing::ScriptedTransport;

    const ENDPOINT: &str = "https://short.test/api";
    const LONG: &str = "https://api.github.com/repos/a/b/zipball/v1";

    fn shortener() -> Shortener {
        Shortener::new(ENDPOINT, "v35.us", Duration::from_secs(10))
    }

    #[test]
    fn test_accepts_http_short_url() {
        let transport = ScriptedTransport::new();
        transport.json(ENDPOINT, json!({"error": "", "url_short": "https://v35.us/abc"}));

        assert_eq!(shortener().shorten(&transport, LONG).as_deref(), Some("https://v35.us/abc"));
        let posts = transport.posts();
        assert_eq!(posts[0].1, json!({"cdn_prefix": "v35.us", "url_long": LONG}));
    }

    #[test]
    fn test_rejects_error_or_non_http() {
        let transport = ScriptedTransport::new();
        transport.json(ENDPOINT, json!({"error": "quota", "url_short": "https://v35.us/abc"}));
        assert_eq!(shortener().shorten(&transport, LONG), None);

        transport.json(ENDPOINT, json!({"error": "", "url_short": "v35.us/abc"}));
        assert_eq!(shortener().shorten(&transport, LONG), None);

        transport.json(ENDPOINT, json!({"url_short": "https://v35.us/abc"}));
        assert_eq!(shortener().shorten(&transport, LONG), None);
    }

    #[test]
    fn test_transport_failure_is_not_fatal() {
        let transport = ScriptedTransport::new();
        transport.fail(ENDPOINT, "connection refused");
        assert_eq!(shortener().shorten(&transport, LONG), None);
    }

    #[test]
    fn test_cache_skips_empty_short_urls() {
        let records: Vec<PluginRecord> = serde_json::from_value(json!([
            {"name": "a", "author": "x", "description": "d", "license": {"name": "MIT"},
             "packageUrl": "https://z/1", "packageShortUrl": "https://s/1"},
            {"name": "b", "author": "x", "description": "d", "license": {"name": "MIT"},
             "packageUrl": "https://z/2", "packageShortUrl": ""}
        ]))
        .unwrap();

        let cache = ShortUrlCache::from_index(&records);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("https://z/1"), Some("https://s/1"));
        assert_eq!(cache.get("https://z/2"), None);
    }
}
