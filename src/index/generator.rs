//! Per-plugin fetch pipeline.
//!
//! For each listing entry the generator gathers release, tag, repository,
//! plugin.json, README and requirements data through the [`GitHubClient`],
//! then hands everything to the normalizer. A failure at any step excludes
//! that plugin only.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::PluginFailure;
use super::listing::{ListingEntry, SourceMode};
use super::merge::{classify, MergeOutcome, SkippedPlugin};
use super::normalize::{normalize, NormalizeSettings, Upstream};
use super::record::PluginRecord;
use super::shortener::{ShortUrlCache, Shortener};
use crate::core::Config;
use crate::github::{GitHubClient, GitHubError, HttpTransport, Release, Transport};
use crate::metadata::RawMetadata;

/// README file names tried, in order, when a long description is missing.
pub const README_CANDIDATES: [&str; 6] =
    ["README.md", "README.MD", "readme.md", "README", "readme", "Readme.md"];

/// Name of the dependency file.
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Builds index records from listing entries.
pub struct IndexGenerator<T: Transport = HttpTransport> {
    client: GitHubClient<T>,
    settings: NormalizeSettings,
    min_long_description: usize,
    shortener: Option<Shortener>,
    previous: Vec<PluginRecord>,
    short_urls: ShortUrlCache,
}

impl<T: Transport> IndexGenerator<T> {
    /// Create a generator with no previous index and no shortener.
    pub fn new(client: GitHubClient<T>, settings: NormalizeSettings) -> Self {
        Self {
            client,
            settings,
            min_long_description: 100,
            shortener: None,
            previous: Vec::new(),
            short_urls: ShortUrlCache::default(),
        }
    }

    /// Create a generator with every setting taken from `config`.
    pub fn from_config(client: GitHubClient<T>, config: &Config) -> Self {
        Self::new(client, NormalizeSettings::from_config(config))
            .with_min_long_description(config.index.min_long_description)
            .with_shortener(Shortener::from_config(config))
    }

    pub fn with_min_long_description(mut self, chars: usize) -> Self {
        self.min_long_description = chars;
        self
    }

    pub fn with_shortener(mut self, shortener: Option<Shortener>) -> Self {
        self.shortener = shortener;
        self
    }

    /// Compare against `previous` and reuse its short URLs.
    pub fn with_previous(mut self, previous: Vec<PluginRecord>) -> Self {
        self.short_urls = ShortUrlCache::from_index(&previous);
        debug!("{} cached short URLs", self.short_urls.len());
        self.previous = previous;
        self
    }

    pub fn client(&self) -> &GitHubClient<T> {
        &self.client
    }

    /// Process every entry and classify the result against the previous index.
    pub fn merge(&mut self, entries: &[ListingEntry]) -> MergeOutcome {
        info!("Processing {} plugins...", entries.len());

        let mut records: Vec<PluginRecord> = Vec::with_capacity(entries.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut skipped = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            debug!("[{}/{}] Processing plugin: {}", index + 1, entries.len(), entry.name);
            match self.process(entry) {
                Ok(record) => match positions.get(record.identity()).copied() {
                    // later entries replace earlier ones in place
                    Some(position) => {
                        debug!("Duplicate listing entry for {}", record.identity());
                        records[position] = record;
                    }
                    None => {
                        positions.insert(record.identity().to_string(), records.len());
                        records.push(record);
                    }
                },
                Err(failure) => {
                    warn!("Failed to process plugin {}: {failure}", entry.name);
                    skipped.push(SkippedPlugin {
                        name: entry.name.clone(),
                        reason: failure.to_string(),
                    });
                }
            }
        }

        let changes = classify(&self.previous, &records);
        MergeOutcome { records, changes, skipped }
    }

    /// Build the record for one entry.
    pub fn process(&mut self, entry: &ListingEntry) -> Result<PluginRecord, PluginFailure> {
        match entry.mode().ok_or(PluginFailure::MissingTag)? {
            SourceMode::Site(site) => self.from_site(entry, site),
            mode => self.from_repository(entry, mode),
        }
    }

    fn from_site(&self, entry: &ListingEntry, site: &str) -> Result<PluginRecord, PluginFailure> {
        let listed: Vec<Value> =
            self.client.get_json(site).map_err(PluginFailure::fetch("site listing"))?;

        let record = listed
            .into_iter()
            .find(|record| record.get("name").and_then(Value::as_str) == Some(entry.name.as_str()))
            .ok_or_else(|| PluginFailure::NotInSite {
                name: entry.name.clone(),
                site: site.to_string(),
            })?;

        serde_json::from_value(record)
            .map_err(|source| PluginFailure::InvalidSiteRecord { site: site.to_string(), source })
    }

    fn from_repository(
        &mut self,
        entry: &ListingEntry,
        mode: SourceMode<'_>,
    ) -> Result<PluginRecord, PluginFailure> {
        let full_name = entry.name.as_str();

        let release = match mode {
            SourceMode::AutoUpdate => {
                Some(self.client.latest_release(full_name).map_err(release_failure)?)
            }
            SourceMode::Tagged(tag) => {
                Some(self.client.release_by_tag(full_name, tag).map_err(release_failure)?)
            }
            SourceMode::ViewOnly | SourceMode::Site(_) => None,
        };

        let git_ref = if entry.view_only { None } else { release_ref(release.as_ref(), mode) };
        let (commit, package_url) = match git_ref.as_deref() {
            Some(tag) => {
                let tag_info = self
                    .client
                    .tag_info(full_name, tag)
                    .map_err(PluginFailure::fetch("tag information"))?
                    .ok_or_else(|| PluginFailure::UnknownTag(tag.to_string()))?;
                (Some(tag_info.commit.sha), Some(tag_info.zipball_url))
            }
            None => (None, None),
        };

        let project =
            self.client.repository(full_name).map_err(PluginFailure::fetch("project data"))?;

        let mut raw = self.plugin_json(entry, git_ref.as_deref())?;
        let too_short =
            raw.long_description_len().map_or(true, |len| len < self.min_long_description);
        if too_short {
            if let Some(readme) = self.readme(entry, git_ref.as_deref()) {
                raw.insert("longdescription", Value::String(readme));
            }
        }

        let dependencies = match git_ref.as_deref() {
            Some(git_ref) => self.requirements(entry, git_ref),
            None => String::new(),
        };

        let short_url = match package_url.as_deref() {
            Some(long_url) => self.short_url(long_url),
            None => String::new(),
        };

        let upstream = Upstream { project, release, commit, package_url, short_url, dependencies };
        Ok(normalize(raw, entry, upstream, &self.settings)?)
    }

    fn plugin_json(
        &self,
        entry: &ListingEntry,
        git_ref: Option<&str>,
    ) -> Result<RawMetadata, PluginFailure> {
        let path = entry.path_in_subdir("plugin.json");
        let url = self.client.contents_url(&entry.name, &path, git_ref);
        debug!("Getting plugin.json from {url}");

        let text = self
            .client
            .file_contents(&entry.name, &path, git_ref)
            .map_err(PluginFailure::fetch("plugin.json"))?;
        RawMetadata::parse(&text).map_err(|source| PluginFailure::Metadata { url, source })
    }

    /// First README found, subdirectory copies first.
    fn readme(&self, entry: &ListingEntry, git_ref: Option<&str>) -> Option<String> {
        let mut candidates: Vec<String> = Vec::new();
        if entry.subdir().is_some() {
            candidates.extend(README_CANDIDATES.iter().map(|name| entry.path_in_subdir(name)));
        }
        candidates.extend(README_CANDIDATES.iter().map(|name| (*name).to_string()));

        candidates.iter().find_map(|path| {
            match self.client.file_contents(&entry.name, path, git_ref) {
                Ok(text) => {
                    debug!("Using {path} as long description for {}", entry.name);
                    Some(text)
                }
                Err(e) => {
                    debug!("No {path} in {}: {e}", entry.name);
                    None
                }
            }
        })
    }

    /// requirements.txt contents, subdirectory first; `""` when absent.
    fn requirements(&self, entry: &ListingEntry, git_ref: &str) -> String {
        let mut candidates = vec![entry.path_in_subdir(REQUIREMENTS_FILE)];
        if entry.subdir().is_some() {
            candidates.push(REQUIREMENTS_FILE.to_string());
        }

        candidates
            .iter()
            .find_map(|path| self.client.file_contents(&entry.name, path, Some(git_ref)).ok())
            .map(|text| clean_requirements(&text))
            .unwrap_or_default()
    }

    fn short_url(&mut self, long_url: &str) -> String {
        if let Some(short) = self.short_urls.get(long_url) {
            return short.to_string();
        }

        let Some(shortener) = &self.shortener else {
            return String::new();
        };
        match shortener.shorten(self.client.transport(), long_url) {
            Some(short) => {
                self.short_urls.insert(long_url, &short);
                short
            }
            None => String::new(),
        }
    }
}

fn release_failure(error: GitHubError) -> PluginFailure {
    if error.is_not_found() {
        PluginFailure::NoRelease
    } else {
        PluginFailure::fetch("release information")(error)
    }
}

/// The git ref to read files at: the release tag for pinned and auto-update entries.
fn release_ref(release: Option<&Release>, mode: SourceMode<'_>) -> Option<String> {
    match mode {
        SourceMode::Tagged(tag) => Some(tag.to_string()),
        SourceMode::AutoUpdate => release.map(|r| r.tag_name.clone()),
        SourceMode::ViewOnly | SourceMode::Site(_) => None,
    }
}

/// Strip a byte order mark and normalize line endings.
pub fn clean_requirements(text: &str) -> String {
    text.strip_prefix('\u{feff}').unwrap_or(text).replace("\r\n", "\n")
}
