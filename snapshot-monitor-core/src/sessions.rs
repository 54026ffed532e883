//! Session directory discovery and snapshot listing.
//!
//! Sessions are created by the test run under `snapshot/{case}/session-*`.
//! The monitor only reads them.

use crate::error::{MonitorError, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Relative paths of every file in one session directory.
pub type SnapshotSet = BTreeSet<PathBuf>;

/// Find the most recently created session directory for a case.
///
/// Returns `None` when the case directory does not exist yet or holds no
/// session directories. Equal creation times are broken by directory name.
pub fn latest_session(case_dir: &Path, prefix: &str) -> Result<Option<PathBuf>> {
    let entries = match std::fs::read_dir(case_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(MonitorError::io(case_dir, e)),
    };

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|e| MonitorError::io(case_dir, e))?;
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(prefix) {
            continue;
        }

        // A session may vanish between listing and stat; skip it.
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }

        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let candidate = (created, entry.path());
        if latest.as_ref().map_or(true, |current| candidate > *current) {
            latest = Some(candidate);
        }
    }

    Ok(latest.map(|(_, path)| path))
}

/// List every file under `session_dir`, relative to it.
pub fn list_snapshots(session_dir: &Path) -> Result<SnapshotSet> {
    let mut snapshots = SnapshotSet::new();
    for entry in WalkDir::new(session_dir).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(session_dir).to_path_buf();
            MonitorError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(session_dir) {
            snapshots.insert(relative.to_path_buf());
        }
    }
    Ok(snapshots)
}

/// Snapshots present in `current` but not in `previous`, sorted.
pub fn new_snapshots(previous: &SnapshotSet, current: &SnapshotSet) -> Vec<PathBuf> {
    current.difference(previous).cloned().collect()
}
