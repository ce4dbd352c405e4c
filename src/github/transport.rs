//! HTTP transport abstraction.
//!
//! [`Transport`] performs exactly one request and reports what came back.
//! Retries, throttling and status interpretation live in the client.

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

use super::error::{GitHubError, GitHubResult};
use crate::core::GitHubConfig;

/// Media type requested from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// Regular JSON representation
    Json,
    /// Raw file contents (contents API)
    Raw,
}

impl MediaType {
    /// Value of the `Accept` header for this media type.
    pub const fn accept(self) -> &'static str {
        match self {
            Self::Json => "application/vnd.github+json",
            Self::Raw => "application/vnd.github.raw+json",
        }
    }
}

/// A transport-level failure (no HTTP response was received).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self(format!("request timed out: {error}"))
        } else {
            Self(error.to_string())
        }
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,

    /// Response headers, names lower-cased
    pub headers: Vec<(String, String)>,

    /// Response body
    pub body: String,
}

impl HttpResponse {
    /// Create a response with no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    /// Add a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the status is 2xx.
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, url: &str) -> GitHubResult<T> {
        serde_json::from_str(&self.body).map_err(|e| GitHubError::InvalidResponse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Performs single HTTP requests.
pub trait Transport {
    /// Issue a GET request.
    fn get(&self, url: &str, media: MediaType) -> Result<HttpResponse, TransportError>;

    /// Issue a POST request with a JSON body.
    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// Blocking `reqwest` transport.
///
/// The access token is only attached to requests aimed at the API base URL,
/// so external listing sites never see it.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    api_base: String,
    token: Option<String>,
}

impl HttpTransport {
    /// Create a transport for the given endpoints.
    pub fn new(
        config: &GitHubConfig,
        token: Option<String>,
        timeout: Duration,
    ) -> GitHubResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GitHubError::Client(e.to_string()))?;

        Ok(Self { client, api_base: config.api_base.trim_end_matches('/').to_string(), token })
    }

    fn read(response: reqwest::blocking::Response) -> Result<HttpResponse, TransportError> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text()?;

        Ok(HttpResponse { status, headers, body })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, media: MediaType) -> Result<HttpResponse, TransportError> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", media.accept())
            .header("X-GitHub-Api-Version", "2022-11-28");

        if let Some(token) = self.token.as_deref().filter(|_| url.starts_with(&self.api_base)) {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        Self::read(request.send()?)
    }

    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let response = self.client.post(url).timeout(timeout).json(body).send()?;
        Self::read(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = HttpResponse::new(200, "{}").with_header("X-RateLimit-Reset", "42");
        assert_eq!(response.header("x-ratelimit-reset"), Some("42"));
        assert_eq!(response.header("X-RATELIMIT-RESET"), Some("42"));
        assert_eq!(response.header("missing"), None);
    }

    #[test]
    fn test_json_decoding_error_names_url() {
        let response = HttpResponse::new(200, "not json");
        let error = response.json::<serde_json::Value>("https://x.test/a").unwrap_err();
        assert!(error.to_string().contains("https://x.test/a"));
    }

    #[test]
    fn test_accept_headers() {
        assert_eq!(MediaType::Json.accept(), "application/vnd.github+json");
        assert_eq!(MediaType::Raw.accept(), "application/vnd.github.raw+json");
    }
}
