//! GitHub REST API response types.
//!
//! Only the fields the index relies on are typed; repository objects keep
//! every other field so they can be republished as `projectData`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A repository as returned by `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/repo`, in GitHub's canonical casing
    pub full_name: String,

    /// Last update time (RFC 3339)
    #[serde(default)]
    pub updated_at: String,

    /// Every other field of the API object
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A release as returned by the releases API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Tag the release points at
    pub tag_name: String,

    /// Publish time (RFC 3339); `null` for drafts
    #[serde(default)]
    pub published_at: Option<String>,

    /// Release title
    #[serde(default)]
    pub name: Option<String>,
}

/// A tag as returned by `GET /repos/{owner}/{repo}/tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name
    pub name: String,

    /// Commit the tag points at
    pub commit: TagCommit,

    /// Source archive URL
    pub zipball_url: String,
}

/// Commit reference inside a [`Tag`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCommit {
    /// Commit SHA
    pub sha: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_keeps_unknown_fields() {
        let repo: Repository = serde_json::from_str(
            r#"{"id": 7, "full_name": "Vector35/sample", "updated_at": "2024-01-02T03:04:05Z", "stargazers_count": 12}"#,
        )
        .unwrap();

        assert_eq!(repo.full_name, "Vector35/sample");
        assert_eq!(repo.extra["stargazers_count"], 12);

        let round = serde_json::to_value(&repo).unwrap();
        assert_eq!(round["id"], 7);
        assert_eq!(round["full_name"], "Vector35/sample");
    }

    #[test]
    fn test_draft_release_has_no_publish_time() {
        let release: Release =
            serde_json::from_str(r#"{"tag_name": "v1", "published_at": null}"#).unwrap();
        assert_eq!(release.published_at, None);
    }
}
