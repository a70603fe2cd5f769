use std::path::{Path, PathBuf};

use crate::models::*;

const SNAPSHOT_PREFIX: &str = "iclasspro-";
const SNAPSHOT_SUFFIX: &str = ".json";

/// Directory of scraped snapshots, named `iclasspro-<timestamp>.json`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Newest snapshot by file name. Names embed an ISO timestamp, so lexicographic
    /// order is chronological.
    pub fn latest(&self) -> Result<PathBuf> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            SyncError::SnapshotUnavailable(format!("{}: {}", self.dir.display(), e))
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_snapshot_name(name))
            .collect();
        names.sort();

        names
            .pop()
            .map(|name| self.dir.join(name))
            .ok_or_else(|| {
                SyncError::SnapshotUnavailable(format!(
                    "no {}*{} files in {}",
                    SNAPSHOT_PREFIX,
                    SNAPSHOT_SUFFIX,
                    self.dir.display()
                ))
            })
    }
}

fn is_snapshot_name(name: &str) -> bool {
    name.len() > SNAPSHOT_PREFIX.len() + SNAPSHOT_SUFFIX.len()
        && name.starts_with(SNAPSHOT_PREFIX)
        && name.ends_with(SNAPSHOT_SUFFIX)
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| SyncError::SnapshotUnavailable(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| SyncError::SnapshotMalformed(format!("{}: {}", path.display(), e)))
}
