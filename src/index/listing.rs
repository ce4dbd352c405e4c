//! Listing configuration entries (`listing.json`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the listing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// `owner/repo`, or the plugin name for external-site entries
    pub name: String,

    /// URL of an external JSON list of canonical records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,

    /// Release tag to publish
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Directory inside the repository holding plugin.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,

    /// Listed without a downloadable package
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub view_only: bool,

    /// Track the latest release instead of a pinned tag
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_update: bool,

    /// Keys this tool does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where an entry's record comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode<'a> {
    /// Copied from an external JSON list
    Site(&'a str),
    /// Latest release of the repository
    AutoUpdate,
    /// Default branch, no release
    ViewOnly,
    /// A pinned release tag
    Tagged(&'a str),
}

impl ListingEntry {
    /// Create a tagged entry.
    pub fn tagged(name: &str, tag: &str) -> Self {
        Self {
            name: name.to_string(),
            site: None,
            tag: Some(tag.to_string()),
            subdir: None,
            view_only: false,
            auto_update: false,
            extra: Map::new(),
        }
    }

    /// Derive the source mode, or `None` when a pinned entry has no tag.
    pub fn mode(&self) -> Option<SourceMode<'_>> {
        if let Some(site) = self.site.as_deref() {
            Some(SourceMode::Site(site))
        } else if self.auto_update {
            Some(SourceMode::AutoUpdate)
        } else if self.view_only {
            Some(SourceMode::ViewOnly)
        } else {
            self.tag.as_deref().map(SourceMode::Tagged)
        }
    }

    /// Owner part of `owner/repo`.
    pub fn owner(&self) -> &str {
        self.name.split('/').next().unwrap_or(&self.name)
    }

    /// Subdirectory without surrounding slashes; `None` when unset or empty.
    pub fn subdir(&self) -> Option<&str> {
        self.subdir.as_deref().map(|s| s.trim_matches('/')).filter(|s| !s.is_empty())
    }

    /// Path of a repository file, relative to the subdirectory when one is set.
    pub fn path_in_subdir(&self, file: &str) -> String {
        match self.subdir() {
            Some(subdir) => format!("{subdir}/{file}"),
            None => file.to_string(),
        }
    }
}
