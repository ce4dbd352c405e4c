//! Record normalizer.
//!
//! Combines a plugin's own plugin.json with what was learned upstream
//! (repository, release, tag, requirements) into one canonical record.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use super::listing::ListingEntry;
use super::record::{PluginRecord, RecordLicense, RECORD_KEYS};
use crate::core::Config;
use crate::github::{Release, Repository};
use crate::metadata::RawMetadata;

/// Package URL published for view-only plugins, which have no package.
pub const VIEW_ONLY_PACKAGE_URL: &str = "https://127.0.0.1/";

/// Key older plugin.json files use for the minimum host version.
pub const LEGACY_MINIMUM_KEY: &str = "minimumbinaryninjaversion";

static NON_PATH_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new("[^a-zA-Z0-9_]").expect("static pattern"));

/// Errors that prevent a record from being normalized.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("release has no publish time")]
    MissingPublishTime,

    #[error("invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("timestamp {0} is out of range")]
    TimestampOutOfRange(i64),

    #[error("required field '{0}' is missing or not text")]
    MissingField(&'static str),
}

/// Constants the normalizer applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeSettings {
    /// Public site base used for project and author links
    pub site_base: String,

    /// Metadata version assumed when a plugin declares none
    pub metadata_version: i64,

    /// Floor for the minimum host version of view-only plugins
    pub view_only_min_version: i64,

    /// Maximum host version used when a plugin declares none
    pub max_version_sentinel: i64,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl NormalizeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            site_base: config.github.site_base.trim_end_matches('/').to_string(),
            metadata_version: config.index.metadata_version,
            view_only_min_version: config.index.view_only_min_version,
            max_version_sentinel: config.index.max_version_sentinel,
        }
    }
}

/// Everything fetched about a plugin besides its plugin.json.
#[derive(Debug, Clone)]
pub struct Upstream {
    /// Repository object
    pub project: Repository,

    /// Release being published; `None` for view-only entries
    pub release: Option<Release>,

    /// Commit SHA of the release tag
    pub commit: Option<String>,

    /// Source archive URL of the release tag
    pub package_url: Option<String>,

    /// Shortened package URL, `""` if none
    pub short_url: String,

    /// requirements.txt contents, `""` if absent
    pub dependencies: String,
}

/// Build the canonical record for one listing entry.
pub fn normalize(
    raw: RawMetadata,
    entry: &ListingEntry,
    upstream: Upstream,
    settings: &NormalizeSettings,
) -> Result<PluginRecord, NormalizeError> {
    let view_only = entry.view_only;
    let Upstream { mut project, release, commit, package_url, short_url, dependencies } = upstream;

    let published = if view_only {
        Some(project.updated_at.as_str())
    } else {
        release.as_ref().and_then(|r| r.published_at.as_deref())
    };
    let last_updated = parse_timestamp(published.ok_or(NormalizeError::MissingPublishTime)?)?;
    project.updated_at = format_timestamp(last_updated)?;

    let mut fields = raw.into_map();

    let name = take_text(&mut fields, "name").ok_or(NormalizeError::MissingField("name"))?;
    let author = take_text(&mut fields, "author").ok_or(NormalizeError::MissingField("author"))?;
    let description =
        take_text(&mut fields, "description").ok_or(NormalizeError::MissingField("description"))?;
    let longdescription = take_text(&mut fields, "longdescription").unwrap_or_default();
    let license = take_license(&mut fields)?;
    let version = take_text(&mut fields, "version").unwrap_or_default();
    let platforms = string_list(fields.remove("platforms"));
    let plugin_type = string_list(fields.remove("type"));
    let api = string_list(fields.remove("api"));
    let installinstructions = match fields.remove("installinstructions") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let pluginmetadataversion = fields
        .remove("pluginmetadataversion")
        .and_then(|v| v.as_i64())
        .unwrap_or(settings.metadata_version);

    let legacy_minimum = fields.remove(LEGACY_MINIMUM_KEY);
    let declared_minimum = fields.remove("minimumBinaryNinjaVersion");
    let mut minimum_version =
        legacy_minimum.or(declared_minimum).and_then(|v| v.as_i64()).unwrap_or(0);
    if view_only && minimum_version < settings.view_only_min_version {
        minimum_version = settings.view_only_min_version;
    }

    let maximum_version = fields
        .remove("maximumBinaryNinjaVersion")
        .and_then(|v| v.as_i64())
        .unwrap_or(settings.max_version_sentinel);

    for key in RECORD_KEYS {
        fields.remove(*key);
    }

    let (package_url, package_short_url) = if view_only {
        (VIEW_ONLY_PACKAGE_URL.to_string(), VIEW_ONLY_PACKAGE_URL.to_string())
    } else {
        (package_url.unwrap_or_default(), short_url)
    };

    Ok(PluginRecord {
        name,
        author,
        description,
        longdescription,
        license,
        platforms,
        installinstructions,
        version,
        plugin_type,
        api,
        pluginmetadataversion,
        minimum_version,
        maximum_version,
        last_updated,
        project_url: format!("{}/{}", settings.site_base, entry.name),
        author_url: format!("{}/{}", settings.site_base, entry.owner()),
        path: sanitize_path(&project.full_name),
        project_data: Some(project),
        package_url,
        package_short_url,
        view_only,
        dependencies,
        commit: if view_only { None } else { commit },
        subdir: entry.subdir.clone(),
        extra: fields,
    })
}

/// Installation directory name for a repository: `/` becomes `_`, then every
/// character outside `[A-Za-z0-9_]` is dropped.
pub fn sanitize_path(full_name: &str) -> String {
    NON_PATH_CHARS.replace_all(&full_name.replace('/', "_"), "").into_owned()
}

/// Parse an RFC 3339 time into epoch seconds.
pub fn parse_timestamp(value: &str) -> Result<i64, NormalizeError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.timestamp())
        .map_err(|source| NormalizeError::InvalidTimestamp { value: value.to_string(), source })
}

/// Render epoch seconds as RFC 3339 in UTC.
pub fn format_timestamp(seconds: i64) -> Result<String, NormalizeError> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map(|t| t.to_rfc3339())
        .ok_or(NormalizeError::TimestampOutOfRange(seconds))
}

/// Remove a field and render it as text; numbers and booleans are stringified.
fn take_text(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key)? {
        Value::String(s) => Some(s),
        value @ (Value::Number(_) | Value::Bool(_)) => Some(value.to_string()),
        _ => None,
    }
}

fn take_license(fields: &mut Map<String, Value>) -> Result<RecordLicense, NormalizeError> {
    let Some(Value::Object(mut map)) = fields.remove("license") else {
        return Err(NormalizeError::MissingField("license"));
    };
    let name = take_text(&mut map, "name").ok_or(NormalizeError::MissingField("license.name"))?;
    let text = take_text(&mut map, "text").unwrap_or_default();
    Ok(RecordLicense { name, text, extra: map })
}

/// A list of strings from a list, or a one-element list from a bare string.
fn string_list(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s],
        Some(Value::Array(items)) => {
            items.into_iter().filter_map(|item| item.as_str().map(str::to_string)).collect()
        }
        _ => Vec::new(),
    }
}
