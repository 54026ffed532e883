//! Filesystem layout of a watched case.
//!
//! ```text
//! {workspace}/input/records/{case}.py                  source script
//! {workspace}/input/records/{case}_with_snapshots.py   transcript (output)
//! {workspace}/input/snapshot/{case}/session-*/         snapshot sessions
//! ```

use crate::error::{MonitorError, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseLayout {
    records_dir: PathBuf,
    snapshot_dir: PathBuf,
    case_id: String,
}

impl CaseLayout {
    pub fn new(
        records_dir: impl Into<PathBuf>,
        snapshot_dir: impl Into<PathBuf>,
        case_id: impl Into<String>,
    ) -> Self {
        Self {
            records_dir: records_dir.into(),
            snapshot_dir: snapshot_dir.into(),
            case_id: case_id.into(),
        }
    }

    /// Layout rooted at `{workspace_root}/input`.
    pub fn from_workspace(workspace_root: &Path, case_id: impl Into<String>) -> Self {
        let input = workspace_root.join("input");
        Self::new(input.join("records"), input.join("snapshot"), case_id)
    }

    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    pub fn source_file(&self) -> PathBuf {
        self.records_dir.join(format!("{}.py", self.case_id))
    }

    pub fn output_file(&self) -> PathBuf {
        self.records_dir
            .join(format!("{}_with_snapshots.py", self.case_id))
    }

    /// Parent of this case's session directories. May not exist yet.
    pub fn case_snapshot_dir(&self) -> PathBuf {
        self.snapshot_dir.join(&self.case_id)
    }

    /// Check that everything needed before monitoring can start exists.
    pub fn validate(&self) -> Result<()> {
        if !self.records_dir.is_dir() {
            return Err(MonitorError::MissingRecordsDir(self.records_dir.clone()));
        }
        if !self.snapshot_dir.is_dir() {
            return Err(MonitorError::MissingSnapshotDir(self.snapshot_dir.clone()));
        }
        let source = self.source_file();
        if !source.is_file() {
            return Err(MonitorError::MissingSourceFile(source));
        }
        Ok(())
    }

    /// Whether a change notification for `path` concerns the source script.
    pub fn is_source_event(&self, path: &Path) -> bool {
        let expected = format!("{}.py", self.case_id);
        path.file_name().is_some_and(|name| name == expected.as_str())
    }
}
