#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unnecessary_lazy_evaluations)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::or_fun_call)]

//! # plugin-index
//!
//! Maintains the Binary Ninja community plugin index.
//!
//! Plugins are listed in `listing.json`. For each entry the generator fetches
//! release, tag, repository and `plugin.json` data from the GitHub API,
//! normalizes it into a canonical record, and classifies it against the
//! previously published `plugins.json` as new, updated or removed.
//!
//! ## Features
//!
//! - **Resilient fetching**: throttled requests, exponential backoff and
//!   rate-limit waits that do not use up retry attempts
//! - **Schema validation**: every plugin.json defect reported in one pass
//! - **Safe writes**: timestamped backup before every overwrite
//! - **Submission checks**: validate a repository named in an issue body
//!
//! ## Quick Start
//!
//! ```bash
//! # Regenerate plugins.json and README.md
//! GITHUB_TOKEN=... plugin-index generate
//!
//! # Check a plugin.json before submitting
//! plugin-index plugin check plugin.json
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unnecessary_map_or)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::ref_option)]

pub mod core;
pub mod github;
pub mod index;
pub mod metadata;
pub mod submission;

// Re-export commonly used types
pub use core::{Config, RetryPolicy};
pub use github::{GitHubClient, GitHubError};
pub use index::{IndexGenerator, ListingEntry, MergeOutcome, PluginRecord};
pub use metadata::{PluginMetadata, RawMetadata, Validator};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "plugin-index";
