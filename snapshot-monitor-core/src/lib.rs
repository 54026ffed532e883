//! Snapshot monitor core library.
//!
//! Watches a recorded browser test script while the test runs. Every time new
//! action lines (`page.*`) are appended, the monitor waits for the run to
//! drop new snapshot files into the latest session directory and appends the
//! actions, annotated with those snapshot paths, to
//! `{case}_with_snapshots.py`. New assertion lines (`expect(...)`) are copied
//! over as they appear.

pub mod config;
pub mod error;
pub mod layout;
pub mod monitor;
pub mod script;
pub mod sessions;
pub mod transcript;
pub mod watch;

pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use layout::CaseLayout;
pub use monitor::{ActionBatch, CheckOutcome, SnapshotMonitor};

use std::future::Future;
use watch::FsWatcher;

/// Validate the case, then monitor it until `shutdown` resolves.
///
/// Configuration problems are returned before any file is written or watched.
pub async fn start<F>(layout: CaseLayout, config: MonitorConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let monitor = SnapshotMonitor::start(layout, config)?;

    let (mut watcher, events) = FsWatcher::new()?;
    watcher.watch(monitor.layout().records_dir(), false)?;

    monitor.run(events, shutdown).await?;

    drop(watcher);
    Ok(())
}
