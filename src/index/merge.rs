//! Listing merger: compares a fresh pass against the previous index.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use super::record::PluginRecord;

/// A plugin left out of this run's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPlugin {
    /// Listing entry name
    pub name: String,

    /// Why it was skipped
    pub reason: String,
}

/// How this run's records differ from the previous index, by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    /// Not present before
    pub new: Vec<String>,

    /// Present before with an older `lastUpdated`
    pub updated: Vec<String>,

    /// Present before, absent now
    pub removed: Vec<String>,
}

impl Changes {
    /// Whether nothing was added, updated or removed.
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Result of a full merge pass.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Every record produced, in listing order
    pub records: Vec<PluginRecord>,

    /// Classification against the previous index
    pub changes: Changes,

    /// Entries that failed
    pub skipped: Vec<SkippedPlugin>,
}

impl MergeOutcome {
    /// Log the change summary.
    pub fn log_summary(&self) {
        for (label, names) in [
            ("New", &self.changes.new),
            ("Updated", &self.changes.updated),
            ("Removed", &self.changes.removed),
        ] {
            info!("{} {label} Plugins:", names.len());
            for name in names {
                info!("\t- {name}");
            }
        }
        if !self.skipped.is_empty() {
            warn!("{} plugins skipped", self.skipped.len());
        }
    }
}

/// Classify `current` against `previous`.
///
/// A record is updated only when its `lastUpdated` is strictly newer; equal
/// timestamps are unchanged.
pub fn classify(previous: &[PluginRecord], current: &[PluginRecord]) -> Changes {
    let before: HashMap<&str, i64> =
        previous.iter().map(|record| (record.identity(), record.last_updated)).collect();
    let now: HashSet<&str> = current.iter().map(PluginRecord::identity).collect();

    let mut changes = Changes::default();
    for record in current {
        let identity = record.identity();
        match before.get(identity) {
            None => changes.new.push(identity.to_string()),
            Some(&last) if record.last_updated > last => changes.updated.push(identity.to_string()),
            Some(_) => {}
        }
    }

    let mut seen = HashSet::new();
    for record in previous {
        let identity = record.identity();
        if !now.contains(identity) && seen.insert(identity) {
            changes.removed.push(identity.to_string());
        }
    }

    changes
}
