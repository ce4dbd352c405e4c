//! Plugin index generation.
//!
//! The listing configuration names the plugins to publish. The
//! [`IndexGenerator`] fetches each one, normalizes it into a
//! [`PluginRecord`] and classifies the result against the previous index.
//! The store persists `plugins.json`, and the summary module renders the
//! human-readable table.

mod error;
mod generator;
mod listing;
mod merge;
mod normalize;
mod record;
mod removal;
mod shortener;
mod store;
mod summary;

pub use error::{IndexError, IndexResult, PluginFailure};
pub use generator::{clean_requirements, IndexGenerator, README_CANDIDATES, REQUIREMENTS_FILE};
pub use listing::{ListingEntry, SourceMode};
pub use merge::{classify, Changes, MergeOutcome, SkippedPlugin};
pub use normalize::{
    format_timestamp, normalize, parse_timestamp, sanitize_path, NormalizeError,
    NormalizeSettings, Upstream, LEGACY_MINIMUM_KEY, VIEW_ONLY_PACKAGE_URL,
};
pub use record::{PluginRecord, RecordLicense, RECORD_KEYS};
pub use removal::{load_requests, RemovalPlan, RemovalRequest, RemovalTarget};
pub use shortener::{ShortUrlCache, Shortener};
pub use store::{
    backup_path, load_entries, load_index, load_json, load_listing, save_json, to_json_string,
    INDEX_INDENT, LISTING_INDENT,
};
pub use summary::{render_summary, write_summary};
