//! Annotated transcript writer.
//!
//! The transcript starts as a copy of the source script. New actions are
//! appended with a comment block naming the snapshots they produced:
//!
//! ```text
//!     page.click("#submit")
//!     # - 0003.png
//!     # - dom/0003.html
//!
//!     expect(page.locator(".done")).to_be_visible()
//! ```

use crate::error::{MonitorError, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Transcript {
    path: PathBuf,
}

impl Transcript {
    /// Recreate `output` holding exactly `content` (the source script as
    /// read at startup), discarding any previous run.
    pub fn create(output: &Path, content: &str) -> Result<Self> {
        std::fs::write(output, content).map_err(|e| MonitorError::io(output, e))?;
        Ok(Self {
            path: output.to_path_buf(),
        })
    }

    /// Append each action followed by its snapshot comment block.
    pub fn append_actions(&self, actions: &[String], snapshots: &[PathBuf]) -> Result<()> {
        let block = comment_block(snapshots);
        for action in actions {
            self.append(&format!("{action}\n"))?;
            self.append(&block)?;
        }
        Ok(())
    }

    pub fn append_assertions(&self, assertions: &[String]) -> Result<()> {
        for assertion in assertions {
            self.append(&format!("{assertion}\n"))?;
        }
        Ok(())
    }

    fn append(&self, text: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| MonitorError::io(&self.path, e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| MonitorError::io(&self.path, e))
    }
}

fn comment_block(snapshots: &[PathBuf]) -> String {
    let mut block = String::new();
    for snapshot in snapshots {
        block.push_str("    # - ");
        block.push_str(&display_relative(snapshot));
        block.push('\n');
    }
    block.push('\n');
    block
}

/// Render a relative path with `/` separators regardless of platform.
fn display_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
