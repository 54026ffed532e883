//! Monitor configuration.
//!
//! Loaded from TOML. Every key is optional; missing keys keep the defaults,
//! which reproduce the classic budget of 10 attempts spaced 1.5 s apart.
//!
//! ```toml
//! poll_attempts = 10
//! poll_interval_ms = 1500
//! action_pattern = '^\s*page\.'
//! assertion_pattern = '^\s*expect\('
//! session_prefix = "session-"
//! ```

use crate::error::{MonitorError, Result};
use crate::script::ScriptPatterns;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

/// File name looked up in the workspace root.
pub const WORKSPACE_CONFIG_FILE: &str = "snapshot-monitor.toml";

pub const DEFAULT_ACTION_PATTERN: &str = r"^\s*page\.";
pub const DEFAULT_ASSERTION_PATTERN: &str = r"^\s*expect\(";
pub const DEFAULT_SESSION_PREFIX: &str = "session-";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// How many times to look for new snapshots after new actions appear.
    #[validate(range(min = 1, max = 1000))]
    pub poll_attempts: u32,

    /// Delay between two snapshot lookups, in milliseconds.
    #[validate(range(min = 10, max = 600000))]
    pub poll_interval_ms: u64,

    /// Regex a line must match to count as an action.
    #[validate(length(min = 1))]
    pub action_pattern: String,

    /// Regex a line must match to count as an assertion.
    #[validate(length(min = 1))]
    pub assertion_pattern: String,

    /// Name prefix of session directories under the case snapshot dir.
    #[validate(length(min = 1))]
    pub session_prefix: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_attempts: 10,
            poll_interval_ms: 1500,
            action_pattern: DEFAULT_ACTION_PATTERN.to_string(),
            assertion_pattern: DEFAULT_ASSERTION_PATTERN.to_string(),
            session_prefix: DEFAULT_SESSION_PREFIX.to_string(),
        }
    }
}

impl MonitorConfig {
    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| MonitorError::io(path, e))?;
        toml::from_str(&contents).map_err(|source| MonitorError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the effective config.
    ///
    /// Priority:
    /// 1. `explicit` path (from `--config` or `SNAPSHOT_MONITOR_CONFIG`)
    /// 2. `snapshot-monitor.toml` in the workspace root
    /// 3. OS config directory (`.../snapshot-monitor/config.toml`)
    /// 4. Built-in defaults
    pub fn resolve(explicit: Option<&Path>, workspace_root: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => discover_config_file(workspace_root),
        };

        let config = match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading monitor config");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        config.ensure_valid()?;
        Ok(config)
    }

    /// Range and emptiness checks. Patterns are checked when compiled.
    pub fn ensure_valid(&self) -> Result<()> {
        self.validate()?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Compile the line patterns.
    pub fn patterns(&self) -> Result<ScriptPatterns> {
        ScriptPatterns::new(&self.action_pattern, &self.assertion_pattern)
    }
}

fn discover_config_file(workspace_root: &Path) -> Option<PathBuf> {
    let local = workspace_root.join(WORKSPACE_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    let global = global_config_file()?;
    global.is_file().then_some(global)
}

/// `config.toml` in the per-user config directory of this tool.
fn global_config_file() -> Option<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("", "", "snapshot-monitor")?;
    Some(proj_dirs.config_dir().join("config.toml"))
}
