//! GitHub client error types.

use thiserror::Error;

/// Result type for GitHub operations.
pub type GitHubResult<T> = Result<T, GitHubError>;

/// Error type for GitHub API operations.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// Network failure or timeout before a response arrived
    #[error("HTTP error: {0}")]
    Transport(String),

    /// Authentication failed
    #[error("Bad credentials, check access token (while fetching {url})")]
    BadCredentials { url: String },

    /// Resource not found
    #[error("Not found: {url}")]
    NotFound { url: String },

    /// API returned an error
    #[error("GitHub API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    /// Rate limit persisted past the configured number of waits
    #[error("Rate limited while fetching {url}")]
    RateLimited { url: String },

    /// Every attempt failed with a retryable error
    #[error("Failed to fetch {url} after {attempts} attempts: {source}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<GitHubError>,
    },

    /// Response body could not be decoded
    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// Client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl GitHubError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the error means the requested resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
