//! Raw, untrusted plugin.json contents.

use serde_json::{Map, Value};
use thiserror::Error;

use super::schema::PluginMetadata;
use super::validate::{ValidationReport, Validator};

/// Key older plugin.json files nest their metadata under.
pub const LEGACY_WRAPPER_KEY: &str = "plugin";

/// Errors reading a plugin.json document.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Not valid JSON.
    #[error("plugin.json is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Valid JSON, but not an object.
    #[error("plugin.json must contain a JSON object")]
    NotAnObject,
}

/// A plugin.json object exactly as the plugin author wrote it.
///
/// Nothing about its shape is trusted until it passes the [`Validator`] or
/// the index normalizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetadata(Map<String, Value>);

impl RawMetadata {
    /// Parse plugin.json text, tolerating a UTF-8 byte order mark.
    pub fn parse(text: &str) -> Result<Self, MetadataError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Wrap a JSON value, unwrapping the legacy `plugin` container.
    pub fn from_value(value: Value) -> Result<Self, MetadataError> {
        match value {
            Value::Object(mut map) => {
                if matches!(map.get(LEGACY_WRAPPER_KEY), Some(Value::Object(_))) {
                    if let Some(Value::Object(inner)) = map.remove(LEGACY_WRAPPER_KEY) {
                        return Ok(Self(inner));
                    }
                }
                Ok(Self(map))
            }
            _ => Err(MetadataError::NotAnObject),
        }
    }

    /// Take the underlying map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a field.
    pub fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    /// Length in characters of `longdescription`, if it is a string.
    pub fn long_description_len(&self) -> Option<usize> {
        self.0.get("longdescription").and_then(Value::as_str).map(|s| s.chars().count())
    }

    /// Run the schema validator.
    pub fn validate(&self, validator: &Validator) -> ValidationReport {
        validator.validate(&self.0)
    }

    /// Validate and convert into the typed record.
    pub fn into_validated(self, validator: &Validator) -> Result<PluginMetadata, ValidationReport> {
        let mut report = self.validate(validator);
        if !report.is_valid() {
            return Err(report);
        }

        let mut map = self.0;
        if map.contains_key("minimumbinaryninjaversion") {
            map.remove("minimumBinaryNinjaVersion");
        }

        serde_json::from_value(Value::Object(map)).map_err(|e| {
            report.push("<root>", e.to_string());
            report
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::metadata::Platform;

    #[test]
    fn test_legacy_wrapper_is_unwrapped() {
        let raw = RawMetadata::from_value(json!({"plugin": {"name": "Old"}})).unwrap();
        assert_eq!(raw.get("name"), Some(&json!("Old")));
    }

    #[test]
    fn test_non_object_wrapper_is_kept() {
        let raw = RawMetadata::from_value(json!({"plugin": "x", "name": "New"})).unwrap();
        assert_eq!(raw.get("plugin"), Some(&json!("x")));
    }

    #[test]
    fn test_parse_strips_bom() {
        let raw = RawMetadata::parse("\u{feff}{\"name\": \"Bom\"}").unwrap();
        assert_eq!(raw.get("name"), Some(&json!("Bom")));
    }

    #[test]
    fn test_parse_rejects_arrays() {
        assert!(matches!(RawMetadata::parse("[]"), Err(MetadataError::NotAnObject)));
    }

    #[test]
    fn test_into_validated_builds_typed_record() {
        let raw = RawMetadata::from_value(json!({
            "pluginmetadataversion": 2,
            "name": "Sample",
            "type": ["helper"],
            "api": ["python3"],
            "description": "d",
            "longdescription": "ld",
            "license": {"name": "MIT", "text": "t"},
            "platforms": ["Windows"],
            "installinstructions": {"Windows": "copy"},
            "version": "1.2",
            "author": "me",
            "minimumbinaryninjaversion": 1200,
            "dependencies": {"pip": ["requests"]}
        }))
        .unwrap();

        let metadata = raw.into_validated(&Validator::default()).unwrap();
        assert_eq!(metadata.platforms, vec![Platform::Windows]);
        assert_eq!(metadata.minimumbinaryninjaversion, 1200);
        assert_eq!(metadata.dependencies.unwrap()["pip"], vec!["requests".to_string()]);
    }

    #[test]
    fn test_into_validated_returns_report() {
        let raw = RawMetadata::from_value(json!({"name": "Incomplete"})).unwrap();
        let report = raw.into_validated(&Validator::default()).unwrap_err();
        assert!(report.issues().len() > 5);
    }
}
