//! Action and assertion extraction from a recorded test script.

use crate::error::{MonitorError, Result};
use regex::Regex;
use std::path::Path;

/// Line classifiers for a test script.
#[derive(Debug, Clone)]
pub struct ScriptPatterns {
    action: Regex,
    assertion: Regex,
}

/// Ordered action and assertion lines found in a script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptLines {
    pub actions: Vec<String>,
    pub assertions: Vec<String>,
}

impl ScriptPatterns {
    pub fn new(action: &str, assertion: &str) -> Result<Self> {
        let action = Regex::new(action).map_err(|source| MonitorError::InvalidPattern {
            kind: "action",
            source,
        })?;
        let assertion = Regex::new(assertion).map_err(|source| MonitorError::InvalidPattern {
            kind: "assertion",
            source,
        })?;
        Ok(Self { action, assertion })
    }

    /// Classify every line of `content`. Each pattern sees one line at a time,
    /// so a match never spans a line break.
    pub fn extract(&self, content: &str) -> ScriptLines {
        let mut lines = ScriptLines::default();
        for line in content.lines() {
            if self.action.is_match(line) {
                lines.actions.push(line.to_string());
            }
            if self.assertion.is_match(line) {
                lines.assertions.push(line.to_string());
            }
        }
        lines
    }

    pub fn read(&self, path: &Path) -> Result<ScriptLines> {
        let content = std::fs::read_to_string(path).map_err(|e| MonitorError::io(path, e))?;
        Ok(self.extract(&content))
    }
}

impl ScriptLines {
    /// Lines appended after the first `action_count` actions and
    /// `assertion_count` assertions. Lines are assumed to be appended only;
    /// a script that shrank yields nothing new.
    pub fn appended_since(&self, action_count: usize, assertion_count: usize) -> ScriptLines {
        ScriptLines {
            actions: self.actions.get(action_count..).unwrap_or_default().to_vec(),
            assertions: self
                .assertions
                .get(assertion_count..)
                .unwrap_or_default()
                .to_vec(),
        }
    }
}
