//! Persisted index and listing files.
//!
//! Files are read once at the start of a run and written once at the end.
//! A write first moves the existing file to a timestamped backup, then
//! renames a fully written temp file into place. The backup is put back if
//! the new contents cannot be written.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tracing::{error, info};

use super::error::{IndexError, IndexResult};
use super::listing::ListingEntry;
use super::record::PluginRecord;

/// Indentation of `plugins.json`.
pub const INDEX_INDENT: usize = 4;

/// Indentation of `listing.json`.
pub const LISTING_INDENT: usize = 2;

/// Load the previously published index; a missing file is an empty index.
pub fn load_index(path: &Path) -> IndexResult<Vec<PluginRecord>> {
    if !path.exists() {
        info!("No existing index at {}, starting empty", path.display());
        return Ok(Vec::new());
    }
    load_json(path)
}

/// Load the listing configuration.
pub fn load_listing(path: &Path) -> IndexResult<Vec<ListingEntry>> {
    load_json(path)
}

/// Load a JSON array without interpreting its elements.
pub fn load_entries(path: &Path) -> IndexResult<Vec<Value>> {
    load_json(path)
}

/// Read and decode a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> IndexResult<T> {
    let content = fs::read_to_string(path)
        .map_err(|source| IndexError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&content)
        .map_err(|source| IndexError::Parse { path: path.to_path_buf(), source })
}

/// Render pretty JSON with the given indentation and a trailing newline.
pub fn to_json_string<T: Serialize + ?Sized>(
    value: &T,
    indent: usize,
) -> serde_json::Result<String> {
    let indent = " ".repeat(indent);
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    buffer.push(b'\n');
    // serde_json only emits UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Backup file name for `path` taken now.
pub fn backup_path(path: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".backup.{stamp}"));
    path.with_file_name(name)
}

/// Write `value` to `path`, keeping the previous contents as a backup.
///
/// The previous file is renamed to its backup, then the new contents are
/// written to a sibling temp file and renamed into place, so `path` is never
/// left half-written. If either step fails the backup is renamed back.
///
/// Returns the backup path when a previous file existed.
pub fn save_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    indent: usize,
) -> IndexResult<Option<PathBuf>> {
    let content = to_json_string(value, indent)
        .map_err(|source| IndexError::Serialize { path: path.to_path_buf(), source })?;

    let backup = if path.exists() {
        let backup = backup_path(path);
        fs::rename(path, &backup)
            .map_err(|source| IndexError::Backup { path: path.to_path_buf(), source })?;
        info!("Created backup: {}", backup.display());
        Some(backup)
    } else {
        None
    };

    if let Err(source) = write_file_atomic(path, &content) {
        error!("Failed to write {}: {source}", path.display());
        let restored = backup.as_ref().is_some_and(|backup| fs::rename(backup, path).is_ok());
        if restored {
            info!("Restored backup due to save failure");
        }
        return Err(IndexError::Write { path: path.to_path_buf(), restored, source });
    }

    Ok(backup)
}

/// Sibling file the new contents are written to before the rename.
pub fn temp_path(path: &Path) -> PathBuf {
    path.with_extension("tmp")
}

fn write_file_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let temp = temp_path(path);
    let result = fs::write(&temp, content).and_then(|()| fs::rename(&temp, path));
    if result.is_err() {
        // leaves a pre-existing directory alone
        let _ = fs::remove_file(&temp);
    }
    result
}
