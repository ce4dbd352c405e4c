//! Validation of plugin submissions made through the issue tracker.
//!
//! The issue body names a repository. Its latest release must exist and
//! carry a plugin.json that parses; schema findings are reported, and fail
//! the submission only in strict mode.

use thiserror::Error;
use tracing::{info, warn};

use crate::github::{GitHubClient, GitHubError, Transport};
use crate::metadata::{MetadataError, RawMetadata, ValidationReport, Validator};

/// Environment variable holding the issue body.
pub const ISSUE_CONTENT_VAR: &str = "ISSUE_CONTENT";

const REPO_URL_PREFIX: &str = "Repo URL:";
const GITHUB_URL_PREFIX: &str = "https://github.com/";

/// Reasons a submission is rejected.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("ISSUE_CONTENT environment variable not set")]
    MissingContent,

    #[error("No GitHub repository URL found in issue content")]
    NoRepository,

    #[error("Invalid repository format: {0}")]
    InvalidRepository(String),

    #[error("Repository {0}: Couldn't get release information. Likely the user created a tag but no associated release.")]
    NoRelease(String),

    #[error("Bad credentials, check access token.")]
    BadCredentials,

    #[error("Failed to load valid release data for {repo}: {source}")]
    Release {
        repo: String,
        #[source]
        source: GitHubError,
    },

    #[error("Failed to fetch plugin.json from {repo} at {tag}: {source}")]
    Fetch {
        repo: String,
        tag: String,
        #[source]
        source: GitHubError,
    },

    #[error("Failed to parse plugin.json from {repo}: {source}")]
    Parse {
        repo: String,
        #[source]
        source: MetadataError,
    },

    #[error("plugin.json in {repo} failed {} schema checks", report.issues().len())]
    Invalid { repo: String, report: ValidationReport },
}

/// Outcome of an accepted submission.
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    /// Lowercased `owner/repo`
    pub repository: String,

    /// Tag of the latest release
    pub tag: String,

    /// Schema findings for the release's plugin.json
    pub validation: ValidationReport,
}

/// Read the issue body from the environment.
pub fn issue_content() -> Result<String, SubmissionError> {
    std::env::var(ISSUE_CONTENT_VAR)
        .ok()
        .filter(|content| !content.trim().is_empty())
        .ok_or(SubmissionError::MissingContent)
}

/// Find the submitted repository in an issue body.
///
/// A `Repo URL:` line wins over a bare GitHub URL line.
pub fn find_repository(content: &str) -> Result<String, SubmissionError> {
    let line = content
        .lines()
        .find(|line| line.starts_with(REPO_URL_PREFIX))
        .or_else(|| content.lines().find(|line| line.starts_with(GITHUB_URL_PREFIX)))
        .ok_or(SubmissionError::NoRepository)?;

    let url = line.split_whitespace().last().unwrap_or_default().to_lowercase();
    let repo = url.strip_prefix(GITHUB_URL_PREFIX).unwrap_or(&url).trim().trim_matches('/');

    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok(repo.to_string()),
        _ => Err(SubmissionError::InvalidRepository(repo.to_string())),
    }
}

/// Validate the submission described by `content`.
pub fn validate_submission<T: Transport>(
    client: &GitHubClient<T>,
    validator: &Validator,
    content: &str,
    strict: bool,
) -> Result<SubmissionReport, SubmissionError> {
    let repo = find_repository(content)?;
    info!("Validating repository: {repo}");

    let release = client.latest_release(&repo).map_err(|source| match source {
        GitHubError::NotFound { .. } => SubmissionError::NoRelease(repo.clone()),
        GitHubError::BadCredentials { .. } => SubmissionError::BadCredentials,
        source => SubmissionError::Release { repo: repo.clone(), source },
    })?;
    let tag = release.tag_name;

    let text = client.file_contents(&repo, "plugin.json", Some(&tag)).map_err(|source| {
        SubmissionError::Fetch { repo: repo.clone(), tag: tag.clone(), source }
    })?;
    let raw = RawMetadata::parse(&text)
        .map_err(|source| SubmissionError::Parse { repo: repo.clone(), source })?;

    let validation = raw.validate(validator);
    if !validation.is_valid() {
        if strict {
            return Err(SubmissionError::Invalid { repo, report: validation });
        }
        let count = validation.issues().len();
        warn!("{count} schema findings in {repo} (not fatal without --strict)");
    }

    info!("Successfully validated repository {repo} with tag {tag}");
    Ok(SubmissionReport { repository: repo, tag, validation })
}
