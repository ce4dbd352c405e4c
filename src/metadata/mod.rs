//! Plugin metadata (plugin.json) handling.
//!
//! A plugin.json starts life as [`RawMetadata`]. The [`Validator`] checks it
//! against the schema and reports every violation at once; a record that
//! passes can be turned into the typed [`PluginMetadata`], from which the
//! per-plugin README and LICENSE are rendered.

mod document;
mod raw;
mod schema;
mod validate;

pub use document::{render_license, render_readme};
pub use raw::{MetadataError, RawMetadata, LEGACY_WRAPPER_KEY};
pub use schema::{
    License, Platform, PluginApi, PluginMetadata, PluginType, CURRENT_METADATA_VERSION,
    LICENSE_KEYS,
};
pub use validate::{validate, ValidationIssue, ValidationReport, Validator};
