//! Schema validator for plugin.json records.
//!
//! Every check runs and logs on its own, so one pass reports every defect in
//! a submission rather than stopping at the first.

use serde_json::{Map, Value};
use tracing::{error, info};

use super::schema::{Platform, PluginApi, PluginType, CURRENT_METADATA_VERSION, LICENSE_KEYS};

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Top-level field the issue concerns
    pub field: String,

    /// Human-readable description
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Outcome of validating one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Whether every check passed.
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Every recorded violation, in check order.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Record and log a violation.
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        let issue = ValidationIssue { field: field.to_string(), message: message.into() };
        error!("{issue}");
        self.issues.push(issue);
    }

    /// Whether any violation concerns `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

/// Validates raw metadata maps against the schema.
#[derive(Debug, Clone)]
pub struct Validator {
    metadata_version: i64,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(CURRENT_METADATA_VERSION)
    }
}

impl Validator {
    /// Create a validator accepting exactly `metadata_version`.
    pub fn new(metadata_version: i64) -> Self {
        Self { metadata_version }
    }

    /// Validate any JSON value; non-objects fail with a single issue.
    pub fn validate_value(&self, value: &Value) -> ValidationReport {
        match value.as_object() {
            Some(record) => self.validate(record),
            None => {
                let mut report = ValidationReport::default();
                report.push("<root>", format!("expected a JSON object, found {}", kind(value)));
                report
            }
        }
    }

    /// Run every check against `record`.
    pub fn validate(&self, record: &Map<String, Value>) -> ValidationReport {
        let mut report = ValidationReport::default();

        if check_integer(&mut report, record, "pluginmetadataversion") {
            if record["pluginmetadataversion"].as_i64() != Some(self.metadata_version) {
                report.push(
                    "pluginmetadataversion",
                    "'pluginmetadataversion' is not the correct version",
                );
            }
        } else {
            info!("Current version is {}", self.metadata_version);
        }

        check_string(&mut report, record, "name");
        check_list(&mut report, record, "type", &PluginType::names());
        check_list(&mut report, record, "api", &PluginApi::names());
        check_string(&mut report, record, "description");
        check_string(&mut report, record, "longdescription");
        check_string_map(&mut report, record, "license", &LICENSE_KEYS, Some(&LICENSE_KEYS[..]));

        let platforms_valid = check_list(&mut report, record, "platforms", &Platform::names());
        let declared: Option<Vec<&str>> = platforms_valid.then(|| {
            record["platforms"]
                .as_array()
                .map(|items| items.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default()
        });
        check_string_map(
            &mut report,
            record,
            "installinstructions",
            &Platform::names(),
            declared.as_deref(),
        );
        if let (Some(declared), Some(Value::Object(map))) =
            (&declared, record.get("installinstructions"))
        {
            for key in map.keys() {
                if !declared.contains(&key.as_str()) {
                    report.push(
                        "installinstructions",
                        format!("instructions for '{key}' but it is not a declared platform"),
                    );
                }
            }
        }

        check_string(&mut report, record, "version");
        check_string(&mut report, record, "author");

        let minimum_key = if !record.contains_key("minimumbinaryninjaversion")
            && record.contains_key("minimumBinaryNinjaVersion")
        {
            "minimumBinaryNinjaVersion"
        } else {
            "minimumbinaryninjaversion"
        };
        check_integer(&mut report, record, minimum_key);

        report
    }
}

/// Validate a record with the default schema version.
pub fn validate(record: &Value) -> bool {
    Validator::default().validate_value(record).is_valid()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "an integer",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

fn check_integer(report: &mut ValidationReport, record: &Map<String, Value>, name: &str) -> bool {
    match record.get(name) {
        None => {
            report.push(name, format!("'{name}' field doesn't exist."));
            false
        }
        Some(value) if !value.is_i64() => {
            report.push(name, format!("'{name}' is {} not an integer value", kind(value)));
            false
        }
        Some(_) => true,
    }
}

fn check_string(report: &mut ValidationReport, record: &Map<String, Value>, name: &str) -> bool {
    match record.get(name) {
        None => {
            report.push(name, format!("'{name}' field doesn't exist"));
            false
        }
        Some(value) if !value.is_string() => {
            report.push(name, format!("'{name}' field is {} not a string", kind(value)));
            false
        }
        Some(_) => true,
    }
}

fn check_list(
    report: &mut ValidationReport,
    record: &Map<String, Value>,
    name: &str,
    allowed: &[&str],
) -> bool {
    let items = match record.get(name) {
        None => {
            report.push(name, format!("'{name}' field doesn't exist"));
            return false;
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            report.push(name, format!("'{name}' field isn't a list"));
            return false;
        }
    };

    let mut success = true;
    for item in items {
        let valid = item.as_str().is_some_and(|s| allowed.contains(&s));
        if !valid {
            report.push(name, format!("plugin {name}: {item} not one of {allowed:?}"));
            success = false;
        }
    }
    success
}

fn check_string_map(
    report: &mut ValidationReport,
    record: &Map<String, Value>,
    name: &str,
    valid_keys: &[&str],
    required_keys: Option<&[&str]>,
) -> bool {
    let map = match record.get(name) {
        None => {
            report.push(name, format!("'{name}' field doesn't exist."));
            return false;
        }
        Some(Value::Object(map)) => map,
        Some(value) => {
            report.push(name, format!("'{name}' is {} not a dict type", kind(value)));
            return false;
        }
    };

    let mut success = true;
    for key in required_keys.unwrap_or_default() {
        if !map.contains_key(*key) {
            report.push(name, format!("required subkey '{key}' not in {name}"));
            success = false;
        }
    }

    for (key, value) in map {
        if !valid_keys.contains(&key.as_str()) {
            report.push(
                name,
                format!("key '{key}' is not in the set of valid keys {valid_keys:?}"),
            );
            success = false;
        }
        if !value.is_string() {
            report.push(name, format!("value of '{name}.{key}' is {} not a string", kind(value)));
            success = false;
        }
    }

    success
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn valid_record() -> Value {
        json!({
            "pluginmetadataversion": 2,
            "name": "Sample",
            "type": ["helper", "ui"],
            "api": ["python3"],
            "description": "Does things",
            "longdescription": "Does many things",
            "license": {"name": "MIT", "text": "Copyright 2024 Someone"},
            "platforms": ["Darwin", "Linux"],
            "installinstructions": {"Darwin": "copy it", "Linux": "copy it"},
            "version": "1.0.0",
            "author": "Someone",
            "minimumbinaryninjaversion": 3000
        })
    }

    fn report_for(value: &Value) -> ValidationReport {
        Validator::default().validate_value(value)
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(validate(&valid_record()));
    }

    #[test]
    fn test_missing_version_fails() {
        let mut record = valid_record();
        record.as_object_mut().unwrap().remove("pluginmetadataversion");

        let report = report_for(&record);
        assert!(!report.is_valid());
        assert!(report.mentions("pluginmetadataversion"));
    }

    #[test]
    fn test_wrong_version_fails() {
        let mut record = valid_record();
        record["pluginmetadataversion"] = json!(1);
        assert!(!validate(&record));

        record["pluginmetadataversion"] = json!("2");
        assert!(!validate(&record));
    }

    #[test]
    fn test_every_violation_is_reported() {
        let mut record = valid_record();
        record["name"] = json!(7);
        record["type"] = json!(["plugin"]);
        record["api"] = json!("python3");
        record.as_object_mut().unwrap().remove("author");

        let report = report_for(&record);
        assert_eq!(report.issues().len(), 4);
        for field in ["name", "type", "api", "author"] {
            assert!(report.mentions(field), "missing issue for {field}");
        }
    }

    #[test]
    fn test_license_extra_key_fails() {
        let mut record = valid_record();
        record["license"]["url"] = json!("https://example.test");
        assert!(!validate(&record));
    }

    #[test]
    fn test_license_missing_text_fails() {
        let mut record = valid_record();
        record["license"] = json!({"name": "MIT"});
        let report = report_for(&record);
        assert_eq!(report.issues().len(), 1);
        assert!(report.issues()[0].message.contains("required subkey 'text'"));
    }

    #[test]
    fn test_install_instructions_must_match_platforms() {
        let mut record = valid_record();
        record["installinstructions"] = json!({"Darwin": "copy it", "Windows": "copy it"});

        let report = report_for(&record);
        let messages: Vec<_> = report.issues().iter().map(|i| i.message.as_str()).collect();
        assert_eq!(report.issues().len(), 2, "{messages:?}");
        assert!(messages.iter().any(|m| m.contains("required subkey 'Linux'")));
        assert!(messages.iter().any(|m| m.contains("'Windows' but it is not a declared platform")));
    }

    #[test]
    fn test_install_instructions_unchecked_against_invalid_platforms() {
        let mut record = valid_record();
        record["platforms"] = json!(["BeOS"]);

        let report = report_for(&record);
        assert_eq!(report.issues().len(), 1);
        assert!(report.mentions("platforms"));
    }

    #[test]
    fn test_camel_case_minimum_version_accepted() {
        let mut record = valid_record();
        let object = record.as_object_mut().unwrap();
        object.remove("minimumbinaryninjaversion");
        object.insert("minimumBinaryNinjaVersion".to_string(), json!(3000));
        assert!(validate(&record));
    }

    #[test]
    fn test_non_object_fails() {
        let report = report_for(&json!([1, 2]));
        assert_eq!(report.issues().len(), 1);
        assert!(report.issues()[0].message.contains("a list"));
    }
}
