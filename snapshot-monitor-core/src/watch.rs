//! Filesystem change notifications bridged into a tokio channel.

use crate::error::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Pending notifications kept before new ones are dropped. Dropping is
/// harmless: the next check re-reads the script anyway.
const EVENT_BUFFER: usize = 64;

/// Owns the OS watcher. Dropping it ends the subscription and closes the
/// receiving side of the channel.
pub struct FsWatcher {
    watcher: RecommendedWatcher,
}

impl FsWatcher {
    /// Create a watcher and the channel it reports changed paths on.
    ///
    /// Only create and modify events are forwarded; one path is sent per
    /// affected file.
    pub fn new() -> Result<(Self, mpsc::Receiver<PathBuf>)> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        for path in event.paths {
                            let _ = tx.try_send(path);
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "File watcher error"),
            },
            Config::default(),
        )?;

        Ok((Self { watcher }, rx))
    }

    pub fn watch(&mut self, path: &Path, recursive: bool) -> Result<()> {
        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        self.watcher.watch(path, mode)?;
        tracing::debug!(path = %path.display(), recursive, "Watching path");
        Ok(())
    }
}
