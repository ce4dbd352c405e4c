//! Canonical index records (`plugins.json` entries).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::github::Repository;

/// License as published in the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordLicense {
    /// License name
    pub name: String,

    /// Full license text
    #[serde(default)]
    pub text: String,

    /// Anything else the plugin declared
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One plugin in the published index.
///
/// Keys the index does not interpret are carried through in `extra`, after
/// the known keys, in the order the plugin declared them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRecord {
    pub name: String,
    pub author: String,
    pub description: String,

    #[serde(default)]
    pub longdescription: String,

    pub license: RecordLicense,

    #[serde(default)]
    pub platforms: Vec<String>,

    #[serde(default)]
    pub installinstructions: Map<String, Value>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub version: String,

    #[serde(rename = "type", default, deserialize_with = "one_or_many")]
    pub plugin_type: Vec<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub api: Vec<String>,

    #[serde(default = "default_metadata_version")]
    pub pluginmetadataversion: i64,

    #[serde(rename = "minimumBinaryNinjaVersion", default)]
    pub minimum_version: i64,

    #[serde(rename = "maximumBinaryNinjaVersion", default = "default_max_version")]
    pub maximum_version: i64,

    /// Release (or repository update) time, epoch seconds
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: i64,

    #[serde(rename = "projectUrl", default)]
    pub project_url: String,

    /// Repository object from the API
    #[serde(rename = "projectData", default, skip_serializing_if = "Option::is_none")]
    pub project_data: Option<Repository>,

    #[serde(rename = "authorUrl", default)]
    pub author_url: String,

    #[serde(rename = "packageUrl", default)]
    pub package_url: String,

    #[serde(rename = "packageShortUrl", default)]
    pub package_short_url: String,

    #[serde(default)]
    pub view_only: bool,

    /// requirements.txt contents
    #[serde(default, deserialize_with = "string_or_number")]
    pub dependencies: String,

    /// Installation directory name
    #[serde(default)]
    pub path: String,

    /// Commit the tag points at; `None` for view-only plugins
    #[serde(default)]
    pub commit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keys owned by [`PluginRecord`] fields, never carried in `extra`.
pub const RECORD_KEYS: &[&str] = &[
    "name",
    "author",
    "description",
    "longdescription",
    "license",
    "platforms",
    "installinstructions",
    "version",
    "type",
    "api",
    "pluginmetadataversion",
    "minimumBinaryNinjaVersion",
    "maximumBinaryNinjaVersion",
    "lastUpdated",
    "projectUrl",
    "projectData",
    "authorUrl",
    "packageUrl",
    "packageShortUrl",
    "view_only",
    "dependencies",
    "path",
    "commit",
    "subdir",
];

impl PluginRecord {
    /// Identity used to compare runs: the repository's full name, else the plugin name.
    pub fn identity(&self) -> &str {
        self.project_data.as_ref().map_or(self.name.as_str(), |project| project.full_name.as_str())
    }
}

fn default_metadata_version() -> i64 {
    crate::metadata::CURRENT_METADATA_VERSION
}

fn default_max_version() -> i64 {
    999_999
}

/// Accept either a single string or a list of strings.
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

/// Accept a string or a number, rendering numbers as text.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}
