//! Index error types.
//!
//! [`IndexError`] fails a whole run. [`PluginFailure`] only excludes one
//! plugin from the output.

use std::path::PathBuf;

use thiserror::Error;

use super::normalize::NormalizeError;
use crate::github::GitHubError;
use crate::metadata::MetadataError;

/// Result type for run-level index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Run-level failure reading or writing index files.
#[derive(Debug, Error)]
pub enum IndexError {
    /// File could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not the expected JSON
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Output could not be serialized
    #[error("Failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Output could not be written; `restored` tells whether the backup was put back
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        restored: bool,
        #[source]
        source: std::io::Error,
    },

    /// Existing file could not be moved aside
    #[error("Failed to back up {}: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single plugin was left out of the index.
#[derive(Debug, Error)]
pub enum PluginFailure {
    /// Pinned entry without a tag
    #[error("listing entry has no tag")]
    MissingTag,

    /// Upstream request failed
    #[error("Unable to get {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: GitHubError,
    },

    /// Tag exists but has no published release
    #[error("Couldn't get release information. Likely the user created a tag but no associated release.")]
    NoRelease,

    /// Tag not present in the repository
    #[error("Unable to associate tag {0} with a commit")]
    UnknownTag(String),

    /// External site list has no matching record
    #[error("No plugin matching {name} found in {site}")]
    NotInSite { name: String, site: String },

    /// External site record is malformed
    #[error("Invalid record in {site}: {source}")]
    InvalidSiteRecord {
        site: String,
        #[source]
        source: serde_json::Error,
    },

    /// plugin.json could not be parsed
    #[error("Unable to parse plugin.json from {url}: {source}")]
    Metadata {
        url: String,
        #[source]
        source: MetadataError,
    },

    /// Metadata could not be normalized
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl PluginFailure {
    pub(crate) fn fetch(what: &'static str) -> impl FnOnce(GitHubError) -> Self {
        move |source| Self::Fetch { what, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_failure_names_resource_and_cause() {
        let failure = PluginFailure::fetch("project data")(GitHubError::NotFound {
            url: "https://api.github.com/repos/a/b".to_string(),
        });
        assert_eq!(
            failure.to_string(),
            "Unable to get project data: Not found: https://api.github.com/repos/a/b"
        );
    }

    #[test]
    fn test_write_error_names_path() {
        let error = IndexError::Write {
            path: PathBuf::from("plugins.json"),
            restored: true,
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(error.to_string(), "Failed to write plugins.json: disk full");
    }
}
