//! GitHub API fetch client.
//!
//! Wraps a [`Transport`] with the retry policy: a courtesy throttle before
//! every call, exponential backoff on transport failures and server errors,
//! and rate-limit waits that do not consume an attempt.

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::error::{GitHubError, GitHubResult};
use super::transport::{HttpResponse, HttpTransport, MediaType, Transport, TransportError};
use super::types::{Release, Repository, Tag};
use crate::core::{retry, Attempt, Config, RetryError, RetryPolicy};

/// GitHub API client.
pub struct GitHubClient<T: Transport = HttpTransport> {
    /// Underlying transport
    transport: T,

    /// Retry and throttling policy
    policy: RetryPolicy,

    /// API base URL, without trailing slash
    api_base: String,
}

impl GitHubClient<HttpTransport> {
    /// Create a client talking to the real API with the given token.
    pub fn from_config(config: &Config, token: impl Into<String>) -> GitHubResult<Self> {
        let policy = config.retry_policy();
        let transport =
            HttpTransport::new(&config.github, Some(token.into()), policy.attempt_timeout)?;
        Ok(Self::new(transport, policy, &config.github.api_base))
    }
}

impl<T: Transport> GitHubClient<T> {
    /// Create a client over an arbitrary transport.
    pub fn new(transport: T, policy: RetryPolicy, api_base: &str) -> Self {
        Self { transport, policy, api_base: api_base.trim_end_matches('/').to_string() }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// API URL of a repository.
    pub fn repo_url(&self, full_name: &str) -> String {
        format!("{}/repos/{}", self.api_base, full_name)
    }

    /// Fetch a URL as JSON media type.
    pub fn fetch(&self, url: &str) -> GitHubResult<HttpResponse> {
        self.fetch_as(url, MediaType::Json)
    }

    /// Fetch a URL, applying the retry policy.
    pub fn fetch_as(&self, url: &str, media: MediaType) -> GitHubResult<HttpResponse> {
        let outcome = retry(&self.policy, |attempt| {
            debug!(url, attempt, "GET");
            let result = self.transport.get(url, media);
            self.classify(url, attempt, result)
        });

        if outcome.was_retried() || outcome.rate_limit_waits > 0 {
            debug!(
                url,
                attempts = outcome.attempts,
                waits = outcome.rate_limit_waits,
                elapsed_ms = outcome.total_time.as_millis() as u64,
                "finished after retries"
            );
        }

        match outcome.into_result() {
            Ok(response) => Ok(response),
            Err(RetryError::Fatal(error) | RetryError::Throttled { last: error, .. }) => Err(error),
            Err(RetryError::Exhausted { attempts, last }) => Err(GitHubError::Exhausted {
                url: url.to_string(),
                attempts,
                source: Box::new(last),
            }),
        }
    }

    /// Fetch a URL and decode the JSON body.
    pub fn get_json<D: DeserializeOwned>(&self, url: &str) -> GitHubResult<D> {
        self.fetch(url)?.json(url)
    }

    /// Get repository metadata.
    pub fn repository(&self, full_name: &str) -> GitHubResult<Repository> {
        self.get_json(&self.repo_url(full_name))
    }

    /// Get the latest published release.
    pub fn latest_release(&self, full_name: &str) -> GitHubResult<Release> {
        self.get_json(&format!("{}/releases/latest", self.repo_url(full_name)))
    }

    /// Get the release for a specific tag.
    pub fn release_by_tag(&self, full_name: &str, tag: &str) -> GitHubResult<Release> {
        self.get_json(&format!(
            "{}/releases/tags/{}",
            self.repo_url(full_name),
            urlencoding::encode(tag)
        ))
    }

    /// List repository tags (first page of 100).
    pub fn tags(&self, full_name: &str) -> GitHubResult<Vec<Tag>> {
        self.get_json(&format!("{}/tags?per_page=100", self.repo_url(full_name)))
    }

    /// Find a tag by name.
    pub fn tag_info(&self, full_name: &str, tag: &str) -> GitHubResult<Option<Tag>> {
        Ok(self.tags(full_name)?.into_iter().find(|t| t.name == tag))
    }

    /// URL of a file in the contents API.
    pub fn contents_url(&self, full_name: &str, path: &str, git_ref: Option<&str>) -> String {
        let encoded_path = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let mut url = format!("{}/contents/{}", self.repo_url(full_name), encoded_path);
        if let Some(git_ref) = git_ref {
            url.push_str("?ref=");
            url.push_str(&urlencoding::encode(git_ref));
        }
        url
    }

    /// Get the raw contents of a file, optionally at a given ref.
    pub fn file_contents(
        &self,
        full_name: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> GitHubResult<String> {
        let url = self.contents_url(full_name, path, git_ref);
        Ok(self.fetch_as(&url, MediaType::Raw)?.body)
    }

    fn classify(
        &self,
        url: &str,
        attempt: u32,
        result: Result<HttpResponse, TransportError>,
    ) -> Attempt<HttpResponse, GitHubError> {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                info!("Attempt {attempt} failed for {url}: {e}");
                return Attempt::Transient(GitHubError::Transport(e.0));
            }
        };

        if response.is_success() {
            return Attempt::Success(response);
        }

        if is_rate_limited(&response) {
            let reset_at = response.header("x-ratelimit-reset").and_then(|v| v.parse().ok());
            let wait = self.policy.rate_limit_delay(reset_at, chrono::Utc::now().timestamp());
            warn!("Rate limited. Sleeping for {} seconds.", wait.as_secs());
            return Attempt::Throttled {
                wait,
                error: GitHubError::RateLimited { url: url.to_string() },
            };
        }

        match response.status {
            401 => Attempt::Fatal(GitHubError::BadCredentials { url: url.to_string() }),
            404 => Attempt::Fatal(GitHubError::NotFound { url: url.to_string() }),
            status => {
                let error = GitHubError::Api { status, message: error_message(&response) };
                if error.is_transient() {
                    info!("Attempt {attempt} failed for {url}: {error}");
                    Attempt::Transient(error)
                } else {
                    Attempt::Fatal(error)
                }
            }
        }
    }
}

/// Detect a rate-limit response from its status, headers and body.
fn is_rate_limited(response: &HttpResponse) -> bool {
    if response.status != 403 && response.status != 429 {
        return false;
    }

    response.header("x-ratelimit-remaining") == Some("0")
        || response.body.to_lowercase().contains("rate limit")
}

/// Extract the `message` field of an API error body, or the raw body.
fn error_message(response: &HttpResponse) -> String {
    serde_json::from_str::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| response.body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::testing::ScriptedTransport;

    const API: &str = "https://api.github.com";

    fn client(transport: ScriptedTransport) -> GitHubClient<ScriptedTransport> {
        GitHubClient::new(transport, RetryPolicy::immediate(), API)
    }

    #[test]
    fn test_fetch_success() {
        let transport = ScriptedTransport::new();
        transport.json(&format!("{API}/repos/a/b"), serde_json::json!({"full_name": "a/b"}));

        let client = client(transport);
        let response = client.fetch(&client.repo_url("a/b")).unwrap();
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_transport_failures_are_retried_then_escalated() {
        let url = format!("{API}/repos/a/b");
        let transport = ScriptedTransport::new();
        transport.fail(&url, "connection reset");

        let client = client(transport);
        let error = client.fetch(&url).unwrap_err();

        assert!(matches!(error, GitHubError::Exhausted { attempts: 3, .. }));
        assert!(error.to_string().contains(&url));
        assert!(error.to_string().contains("connection reset"));
        assert_eq!(client.transport().count(&url), 3);
    }

    #[test]
    fn test_recovers_after_transient_failure() {
        let url = format!("{API}/repos/a/b");
        let transport = ScriptedTransport::new();
        transport.queue(&url, Err(TransportError("timeout".to_string())));
        transport.queue(&url, Ok(HttpResponse::new(503, "{\"message\": \"unavailable\"}")));
        transport.json(&url, serde_json::json!({"ok": true}));

        let client = client(transport);
        assert!(client.fetch(&url).is_ok());
        assert_eq!(client.transport().count(&url), 3);
    }

    #[test]
    fn test_not_found_is_terminal() {
        let url = format!("{API}/repos/a/missing");
        let client = client(ScriptedTransport::new());

        let error = client.fetch(&url).unwrap_err();
        assert!(error.is_not_found());
        assert_eq!(client.transport().count(&url), 1);
    }

    #[test]
    fn test_bad_credentials_is_terminal() {
        let url = format!("{API}/repos/a/b");
        let transport = ScriptedTransport::new();
        transport.respond(&url, HttpResponse::new(401, r#"{"message": "Bad credentials"}"#));

        let client = client(transport);
        assert!(matches!(client.fetch(&url), Err(GitHubError::BadCredentials { .. })));
        assert_eq!(client.transport().count(&url), 1);
    }

    #[test]
    fn test_rate_limit_does_not_consume_attempts() {
        let url = format!("{API}/repos/a/b");
        let limited = HttpResponse::new(403, r#"{"message": "API rate limit exceeded"}"#)
            .with_header("X-RateLimit-Remaining", "0")
            .with_header("X-RateLimit-Reset", "0");
        let transport = ScriptedTransport::new();
        for _ in 0..5 {
            transport.queue(&url, Ok(limited.clone()));
        }
        transport.queue(&url, Err(TransportError("reset".to_string())));
        transport.queue(&url, Err(TransportError("reset".to_string())));
        transport.json(&url, serde_json::json!({}));

        let client = client(transport);
        assert!(client.fetch(&url).is_ok());
        assert_eq!(client.transport().count(&url), 8);
    }

    #[test]
    fn test_plain_forbidden_is_not_rate_limit() {
        let url = format!("{API}/repos/a/b");
        let transport = ScriptedTransport::new();
        transport.respond(&url, HttpResponse::new(403, r#"{"message": "Resource not accessible"}"#));

        let client = client(transport);
        match client.fetch(&url) {
            Err(GitHubError::Api { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "Resource not accessible");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_contents_url_encodes_ref_and_path() {
        let client = client(ScriptedTransport::new());
        assert_eq!(
            client.contents_url("a/b", "sub dir/plugin.json", Some("v1.0+1")),
            "https://api.github.com/repos/a/b/contents/sub%20dir/plugin.json?ref=v1.0%2B1"
        );
        assert_eq!(
            client.contents_url("a/b", "/plugin.json", None),
            "https://api.github.com/repos/a/b/contents/plugin.json"
        );
    }

    #[test]
    fn test_tag_info_finds_matching_tag() {
        let transport = ScriptedTransport::new();
        transport.json(
            &format!("{API}/repos/a/b/tags?per_page=100"),
            serde_json::json!([
                {"name": "v2", "commit": {"sha": "bbb"}, "zipball_url": "https://z/v2"},
                {"name": "v1", "commit": {"sha": "aaa"}, "zipball_url": "https://z/v1"}
            ]),
        );

        let client = client(transport);
        let tag = client.tag_info("a/b", "v1").unwrap().unwrap();
        assert_eq!(tag.commit.sha, "aaa");
        assert!(client.tag_info("a/b", "v3").unwrap().is_none());
    }
}
