//! Removal of named entries from the index or the listing.
//!
//! Removal always starts as a plan. Printing the plan is the dry run;
//! applying it rewrites the file through the backup store.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::error::IndexResult;
use super::store::{load_entries, load_json, save_json, INDEX_INDENT, LISTING_INDENT};

/// File a removal applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalTarget {
    /// Published `plugins.json`
    Index,
    /// `listing.json` configuration
    Listing,
}

impl RemovalTarget {
    /// Indentation the file is written with.
    pub const fn indent(self) -> usize {
        match self {
            Self::Index => INDEX_INDENT,
            Self::Listing => LISTING_INDENT,
        }
    }

    /// Names an entry can be matched by.
    fn names(self, entry: &Value) -> Vec<&str> {
        let mut names: Vec<&str> = entry.get("name").and_then(Value::as_str).into_iter().collect();
        if self == Self::Index {
            let full_name = entry.pointer("/projectData/full_name").and_then(Value::as_str);
            names.extend(full_name);
        }
        names
    }
}

/// One entry the operator asked to remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalRequest {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RemovalRequest {
    pub fn named(name: &str) -> Self {
        Self { name: name.to_string(), reason: None }
    }
}

/// Load removal requests from a JSON array of `{name, reason}` objects or names.
pub fn load_requests(path: &Path) -> IndexResult<Vec<RemovalRequest>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Listed {
        Name(String),
        Request(RemovalRequest),
    }

    let listed: Vec<Listed> = load_json(path)?;
    Ok(listed
        .into_iter()
        .map(|item| match item {
            Listed::Name(name) => RemovalRequest::named(&name),
            Listed::Request(request) => request,
        })
        .collect())
}

/// What a removal would do.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalPlan {
    /// Target file kind
    pub target: RemovalTarget,

    /// Entries before removal
    pub original_count: usize,

    /// Entries kept, untouched and in their original order
    pub retained: Vec<Value>,

    /// Requests that matched at least one entry
    pub removed: Vec<RemovalRequest>,

    /// Stale names present in the file; reported, never removed
    pub stale: Vec<String>,

    /// Requests that matched nothing
    pub not_found: Vec<String>,
}

impl RemovalPlan {
    /// Split `entries` into retained and removed.
    pub fn new(
        target: RemovalTarget,
        entries: Vec<Value>,
        requests: &[RemovalRequest],
        stale: &[String],
    ) -> Self {
        let original_count = entries.len();
        let mut matched: HashSet<&str> = HashSet::new();
        let mut stale_found = Vec::new();
        let mut retained = Vec::with_capacity(entries.len());

        for entry in entries {
            let names = target.names(&entry);
            let request = requests.iter().find(|r| names.contains(&r.name.as_str()));
            if let Some(request) = request {
                matched.insert(request.name.as_str());
                continue;
            }
            if let Some(name) = stale.iter().find(|s| names.contains(&s.as_str())) {
                stale_found.push(name.clone());
            }
            retained.push(entry);
        }

        let (removed, not_found): (Vec<_>, Vec<_>) =
            requests.iter().partition(|r| matched.contains(r.name.as_str()));

        Self {
            target,
            original_count,
            retained,
            removed: removed.into_iter().cloned().collect(),
            stale: stale_found,
            not_found: not_found.into_iter().map(|r| r.name.clone()).collect(),
        }
    }

    /// Load `path` and plan the removal.
    pub fn for_file(
        target: RemovalTarget,
        path: &Path,
        requests: &[RemovalRequest],
        stale: &[String],
    ) -> IndexResult<Self> {
        Ok(Self::new(target, load_entries(path)?, requests, stale))
    }

    /// Whether applying the plan would change nothing.
    pub fn is_empty(&self) -> bool {
        self.retained.len() == self.original_count
    }

    /// Log the itemized plan.
    pub fn report(&self, dry_run: bool) {
        let verb = if dry_run { "Would remove" } else { "Removing" };
        for request in &self.removed {
            match &request.reason {
                Some(reason) => warn!("{verb} {} ({reason})", request.name),
                None => warn!("{verb} {}", request.name),
            }
        }
        for name in &self.stale {
            info!("Found stale plugin (keeping for now): {name}");
        }
        for name in &self.not_found {
            info!("Not present, nothing to remove: {name}");
        }

        info!("Original plugin count: {}", self.original_count);
        info!(
            "Plugins {}: {}",
            if dry_run { "that would be removed" } else { "removed" },
            self.original_count - self.retained.len()
        );
        info!("Stale plugins found (kept): {}", self.stale.len());
        info!("Final plugin count: {}", self.retained.len());
    }

    /// Write the retained entries to `path`, returning the backup path.
    pub fn apply(&self, path: &Path) -> IndexResult<Option<PathBuf>> {
        save_json(path, &self.retained, self.target.indent())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn listing() -> Vec<Value> {
        vec![
            json!({"name": "a/keep", "tag": "v1", "zz": 1, "aa": 2}),
            json!({"name": "a/dead", "tag": "v1"}),
            json!({"name": "a/old", "view_only": true}),
            json!({"name": "a/also-dead", "auto_update": true}),
        ]
    }

    #[test]
    fn test_plan_removes_exactly_named_entries() {
        let requests = [
            RemovalRequest::named("a/dead"),
            RemovalRequest {
                name: "a/also-dead".to_string(),
                reason: Some("archived".to_string()),
            },
            RemovalRequest::named("a/missing"),
        ];
        let plan =
            RemovalPlan::new(RemovalTarget::Listing, listing(), &requests, &["a/old".to_string()]);

        assert_eq!(plan.retained, vec![listing()[0].clone(), listing()[2].clone()]);
        assert_eq!(plan.removed.len(), 2);
        assert_eq!(plan.not_found, vec!["a/missing"]);
        assert_eq!(plan.stale, vec!["a/old"]);
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_index_entries_match_full_name() {
        let entries = vec![
            json!({"name": "Pretty Name", "projectData": {"full_name": "a/repo"}}),
            json!({"name": "Other", "projectData": {"full_name": "a/other"}}),
        ];
        let plan = RemovalPlan::new(
            RemovalTarget::Index,
            entries,
            &[RemovalRequest::named("a/repo")],
            &[],
        );
        assert_eq!(plan.retained.len(), 1);
        assert_eq!(plan.retained[0]["name"], "Other");
    }

    #[test]
    fn test_dry_run_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("listing.json");
        let original = serde_json::to_string_pretty(&listing()).unwrap();
        fs::write(&path, &original).unwrap();

        let plan = RemovalPlan::for_file(
            RemovalTarget::Listing,
            &path,
            &[RemovalRequest::named("a/dead")],
            &[],
        )
        .unwrap();
        plan.report(true);

        assert_eq!(fs::read_to_string(&path).unwrap(), original);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_apply_preserves_retained_entries_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("listing.json");
        fs::write(&path, serde_json::to_string(&listing()).unwrap()).unwrap();

        let plan = RemovalPlan::for_file(
            RemovalTarget::Listing,
            &path,
            &[RemovalRequest::named("a/dead"), RemovalRequest::named("a/also-dead")],
            &[],
        )
        .unwrap();
        let backup = plan.apply(&path).unwrap();

        assert!(backup.is_some_and(|b| b.exists()));
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"zz\": 1,\n    \"aa\": 2"));
        let reloaded: Vec<Value> = serde_json::from_str(&written).unwrap();
        assert_eq!(reloaded, vec![listing()[0].clone(), listing()[2].clone()]);
    }

    #[test]
    fn test_load_requests_accepts_names_and_objects() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dead.json");
        fs::write(&path, r#"["a/one", {"name": "a/two", "reason": "gone"}]"#).unwrap();

        let requests = load_requests(&path).unwrap();
        assert_eq!(requests[0], RemovalRequest::named("a/one"));
        assert_eq!(requests[1].reason.as_deref(), Some("gone"));
    }
}
