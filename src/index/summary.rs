//! Summary document (`README.md`) listing every published plugin.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::info;

use super::error::{IndexError, IndexResult};
use super::record::PluginRecord;

const HEADER: &str = "# Binary Ninja Plugins\n\n\
    | PluginName | Author | Description | Last Updated | Type | API | License |\n\
    |------------|--------|-------------|--------------|------|-----|---------|\n";

/// Render the summary table, followed by `footer` when given.
pub fn render_summary(records: &[PluginRecord], footer: Option<&str>) -> String {
    let mut sorted: Vec<&PluginRecord> = records.iter().collect();
    sorted.sort_by_cached_key(|record| record.name.to_lowercase());

    let mut out = String::from(HEADER);
    for record in sorted {
        let _ = writeln!(
            out,
            "|[{}]({})|[{}]({})|{}|{}|{}|{}|{}|",
            record.name,
            record.project_url,
            record.author,
            record.author_url,
            record.description,
            format_date(record.last_updated),
            format_types(&record.plugin_type),
            record.api.first().map_or("None", String::as_str),
            record.license.name,
        );
    }

    if let Some(footer) = footer {
        out.push_str(footer);
        out.push('\n');
    }
    out
}

/// Write the summary document, appending the footer file when it exists.
pub fn write_summary(path: &Path, records: &[PluginRecord], footer: &Path) -> IndexResult<()> {
    let footer = if footer.exists() {
        Some(
            fs::read_to_string(footer)
                .map_err(|source| IndexError::Read { path: footer.to_path_buf(), source })?,
        )
    } else {
        None
    };

    fs::write(path, render_summary(records, footer.as_deref())).map_err(|source| {
        IndexError::Write { path: path.to_path_buf(), restored: false, source }
    })?;
    info!("{} generated successfully", path.display());
    Ok(())
}

fn format_date(seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map_or_else(|| "unknown".to_string(), |t| t.format("%Y-%m-%d").to_string())
}

fn format_types(types: &[String]) -> String {
    if types.is_empty() {
        return "None".to_string();
    }
    let mut sorted = types.to_vec();
    sorted.sort();
    sorted.join(", ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn record(name: &str, types: serde_json::Value, api: serde_json::Value) -> PluginRecord {
        serde_json::from_value(json!({
            "name": name,
            "author": "Someone",
            "description": format!("About {name}"),
            "license": {"name": "MIT"},
            "type": types,
            "api": api,
            "lastUpdated": 1_704_164_645,
            "projectUrl": format!("https://github.com/someone/{name}"),
            "authorUrl": "https://github.com/someone"
        }))
        .unwrap()
    }

    #[test]
    fn test_render_summary() {
        let records = vec![
            record("zeta", json!(["ui", "helper"]), json!(["python3"])),
            record("Alpha", json!([]), json!([])),
            record("beta", json!(["core"]), json!("python3")),
        ];

        insta::assert_snapshot!(render_summary(&records, Some("Footer text")), @r"
        # Binary Ninja Plugins

        | PluginName | Author | Description | Last Updated | Type | API | License |
        |------------|--------|-------------|--------------|------|-----|---------|
        |[Alpha](https://github.com/someone/Alpha)|[Someone](https://github.com/someone)|About Alpha|2024-01-02|None|None|MIT|
        |[beta](https://github.com/someone/beta)|[Someone](https://github.com/someone)|About beta|2024-01-02|core|python3|MIT|
        |[zeta](https://github.com/someone/zeta)|[Someone](https://github.com/someone)|About zeta|2024-01-02|helper, ui|python3|MIT|
        Footer text
        ");
    }

    #[test]
    fn test_write_summary_without_footer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("README.md");

        write_summary(&path, &[], &dir.path().join("INFO")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), HEADER);
    }

    #[test]
    fn test_write_summary_appends_footer_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("README.md");
        let footer = dir.path().join("INFO");
        fs::write(&footer, "See also").unwrap();

        write_summary(&path, &[], &footer).unwrap();
        assert!(fs::read_to_string(&path).unwrap().ends_with("---------|\nSee also\n"));
    }
}
