//! Error taxonomy for the snapshot monitor.

use std::path::PathBuf;

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Records directory not found: {}", .0.display())]
    MissingRecordsDir(PathBuf),

    #[error("Snapshot directory not found: {}", .0.display())]
    MissingSnapshotDir(PathBuf),

    #[error("Source file not found: {}", .0.display())]
    MissingSourceFile(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] validator::ValidationErrors),

    #[error("Failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid {kind} pattern: {source}")]
    InvalidPattern {
        kind: &'static str,
        #[source]
        source: regex::Error,
    },
}

impl MonitorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Startup problems the user has to fix before monitoring can begin.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingRecordsDir(_)
                | Self::MissingSnapshotDir(_)
                | Self::MissingSourceFile(_)
                | Self::InvalidConfig(_)
                | Self::ConfigParse { .. }
                | Self::InvalidPattern { .. }
        )
    }
}
