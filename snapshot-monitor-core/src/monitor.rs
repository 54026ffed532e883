//! SnapshotMonitor: correlates new script lines with new snapshot files.
//!
//! Each time the source script changes, the monitor re-reads it, works out
//! which action and assertion lines were appended since the last check, and
//! for new actions waits (bounded) for the test run to drop new files into
//! the latest session directory. The findings are appended to the transcript.

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::layout::CaseLayout;
use crate::script::{ScriptLines, ScriptPatterns};
use crate::sessions::{self, SnapshotSet};
use crate::transcript::Transcript;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Pause after a notification so an editor's burst of writes lands first.
const SETTLE_DELAY: Duration = Duration::from_millis(50);

/// What the monitor has already seen for its case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseTracker {
    pub action_count: usize,
    pub assertion_count: usize,
    /// Latest session and its listing at the last successful correlation.
    pub snapshots: Option<(PathBuf, SnapshotSet)>,
}

impl CaseTracker {
    /// Files already recorded for `session`. A session other than the one
    /// last recorded has no known files.
    pub fn known_snapshots(&self, session: &Path) -> Option<&SnapshotSet> {
        self.snapshots
            .as_ref()
            .filter(|(recorded, _)| recorded == session)
            .map(|(_, listing)| listing)
    }
}

/// How the new actions of one check were resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionBatch {
    /// The check found no new action lines.
    NoActions,
    /// New snapshots appeared and were written after the actions.
    Annotated(Vec<PathBuf>),
    /// The polling budget ran out; the actions were skipped.
    TimedOut,
}

/// Result of one `on_source_changed` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub new_actions: usize,
    pub new_assertions: usize,
    pub batch: ActionBatch,
}

pub struct SnapshotMonitor {
    layout: CaseLayout,
    config: MonitorConfig,
    patterns: ScriptPatterns,
    transcript: Transcript,
    tracker: CaseTracker,
}

impl SnapshotMonitor {
    /// Validate the layout, recreate the transcript and snapshot the
    /// current state of the script and latest session.
    pub fn start(layout: CaseLayout, config: MonitorConfig) -> Result<Self> {
        layout.validate()?;
        let patterns = config.patterns()?;

        let source = layout.source_file();
        let output = layout.output_file();

        // One read feeds both the tracker and the transcript, so lines
        // appended meanwhile are never counted as already seen.
        let content = std::fs::read_to_string(&source).map_err(|e| MonitorError::io(&source, e))?;
        let lines = patterns.extract(&content);
        let snapshots = match sessions::latest_session(
            &layout.case_snapshot_dir(),
            &config.session_prefix,
        )? {
            Some(session) => {
                let listing = sessions::list_snapshots(&session)?;
                Some((session, listing))
            }
            None => None,
        };

        let transcript = Transcript::create(&output, &content)?;
        tracing::info!(output = %output.display(), "Created initial output file");

        let tracker = CaseTracker {
            action_count: lines.actions.len(),
            assertion_count: lines.assertions.len(),
            snapshots,
        };

        tracing::info!(
            case = %layout.case_id(),
            source = %source.display(),
            output = %output.display(),
            actions = tracker.action_count,
            assertions = tracker.assertion_count,
            snapshots = tracker.snapshots.as_ref().map_or(0, |(_, listing)| listing.len()),
            "Started monitoring case"
        );

        Ok(Self {
            layout,
            config,
            patterns,
            transcript,
            tracker,
        })
    }

    pub fn layout(&self) -> &CaseLayout {
        &self.layout
    }

    pub fn tracker(&self) -> &CaseTracker {
        &self.tracker
    }

    /// Handle one modification of the source script.
    ///
    /// Actions are resolved first (polling for snapshots), then assertions.
    /// Both counters advance even when the snapshot wait times out, and never
    /// move backwards: a script caught mid-rewrite reads as shorter than it is.
    pub async fn on_source_changed(&mut self) -> Result<CheckOutcome> {
        let current = self.patterns.read(&self.layout.source_file())?;
        let new = current.appended_since(self.tracker.action_count, self.tracker.assertion_count);

        let batch = if new.actions.is_empty() {
            ActionBatch::NoActions
        } else {
            self.correlate_actions(&new.actions).await?
        };
        self.tracker.action_count = self.tracker.action_count.max(current.actions.len());

        if !new.assertions.is_empty() {
            self.transcript.append_assertions(&new.assertions)?;
            tracing::info!(count = new.assertions.len(), "Appended new assertions");
        }
        self.tracker.assertion_count = self
            .tracker
            .assertion_count
            .max(current.assertions.len());

        Ok(outcome(&new, batch))
    }

    /// Poll the latest session until it holds files we have not seen yet.
    async fn correlate_actions(&mut self, actions: &[String]) -> Result<ActionBatch> {
        let attempts = self.config.poll_attempts;
        let interval = self.config.poll_interval();
        let case_dir = self.layout.case_snapshot_dir();

        for attempt in 1..=attempts {
            let Some(session) = sessions::latest_session(&case_dir, &self.config.session_prefix)?
            else {
                tracing::info!(attempt, attempts, "Waiting for snapshot directory...");
                tokio::time::sleep(interval).await;
                continue;
            };

            let current = sessions::list_snapshots(&session)?;
            let fresh = match self.tracker.known_snapshots(&session) {
                Some(known) => sessions::new_snapshots(known, &current),
                None => current.iter().cloned().collect(),
            };
            if !fresh.is_empty() {
                self.transcript.append_actions(actions, &fresh)?;
                tracing::info!(
                    actions = actions.len(),
                    snapshots = fresh.len(),
                    session = %session.display(),
                    "Captured new actions with snapshots"
                );
                self.tracker.snapshots = Some((session, current));
                return Ok(ActionBatch::Annotated(fresh));
            }

            tracing::info!(attempt, attempts, "Waiting for new snapshots...");
            tokio::time::sleep(interval).await;
        }

        tracing::warn!(
            actions = actions.len(),
            "Timeout waiting for snapshots; these actions will not be annotated"
        );
        Ok(ActionBatch::TimedOut)
    }

    /// Process change notifications until `shutdown` resolves or the
    /// notification channel closes.
    ///
    /// Notifications already queued when a check starts are folded into it,
    /// since every check re-derives its work from the file contents. A failed
    /// check is logged and the loop keeps waiting for the next change.
    pub async fn run<F>(mut self, mut events: mpsc::Receiver<PathBuf>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = events.recv() => {
                    let Some(path) = event else {
                        tracing::debug!("Change notification channel closed");
                        break;
                    };
                    if !self.layout.is_source_event(&path) {
                        continue;
                    }
                    tokio::time::sleep(SETTLE_DELAY).await;
                    while events.try_recv().is_ok() {}

                    tokio::select! {
                        _ = &mut shutdown => break,
                        result = self.on_source_changed() => {
                            if let Err(e) = result {
                                tracing::error!(error = %e, "Failed to process source change");
                            }
                        }
                    }
                }
            }
        }

        tracing::info!(case = %self.layout.case_id(), "Stopped monitoring case");
        Ok(())
    }
}

fn outcome(new: &ScriptLines, batch: ActionBatch) -> CheckOutcome {
    CheckOutcome {
        new_actions: new.actions.len(),
        new_assertions: new.assertions.len(),
        batch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Fixture {
        _tmp: tempfile::TempDir,
        layout: CaseLayout,
    }

    impl Fixture {
        fn new(source: &str) -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let layout = CaseLayout::from_workspace(tmp.path(), "7");
            fs::create_dir_all(layout.records_dir()).unwrap();
            fs::create_dir_all(layout.snapshot_dir()).unwrap();
            fs::write(layout.source_file(), source).unwrap();
            Self { _tmp: tmp, layout }
        }

        fn append_source(&self, text: &str) {
            let mut content = fs::read_to_string(self.layout.source_file()).unwrap();
            content.push_str(text);
            fs::write(self.layout.source_file(), content).unwrap();
        }

        fn add_snapshot(&self, session: &str, name: &str) {
            let path = self.layout.case_snapshot_dir().join(session).join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"png").unwrap();
        }

        fn output(&self) -> String {
            fs::read_to_string(self.layout.output_file()).unwrap()
        }
    }

    fn quick_config() -> MonitorConfig {
        MonitorConfig {
            poll_attempts: 3,
            poll_interval_ms: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_start_initializes_tracker() {
        let fx = Fixture::new("page.a()\nexpect(x)\npage.b()\n");
        fx.add_snapshot("session-1", "0001.png");

        let monitor = SnapshotMonitor::start(fx.layout.clone(), quick_config()).unwrap();
        assert_eq!(monitor.tracker().action_count, 2);
        assert_eq!(monitor.tracker().assertion_count, 1);
        let session = fx.layout.case_snapshot_dir().join("session-1");
        let known = monitor.tracker().known_snapshots(&session).unwrap();
        assert!(known.contains(Path::new("0001.png")));
        assert_eq!(fx.output(), "page.a()\nexpect(x)\npage.b()\n");
    }

    #[test]
    fn test_start_fails_without_source() {
        let fx = Fixture::new("");
        fs::remove_file(fx.layout.source_file()).unwrap();

        let err = SnapshotMonitor::start(fx.layout.clone(), quick_config())
            .err()
            .unwrap();
        assert!(err.is_config_error());
        assert!(!fx.layout.output_file().exists());
    }

    #[tokio::test]
    async fn test_change_without_new_lines_is_noop() {
        let fx = Fixture::new("page.a()\n");
        let mut monitor = SnapshotMonitor::start(fx.layout.clone(), quick_config()).unwrap();

        fx.append_source("# just a comment\n");
        let outcome = monitor.on_source_changed().await.unwrap();
        assert_eq!(outcome.new_actions, 0);
        assert_eq!(outcome.new_assertions, 0);
        assert_eq!(outcome.batch, ActionBatch::NoActions);
        assert_eq!(fx.output(), "page.a()\n");
    }

    #[tokio::test]
    async fn test_new_action_annotated_with_new_snapshot() {
        let fx = Fixture::new("page.a()\n");
        fx.add_snapshot("session-1", "0001.png");
        let mut monitor = SnapshotMonitor::start(fx.layout.clone(), quick_config()).unwrap();

        fx.append_source("page.b()\n");
        fx.add_snapshot("session-1", "0002.png");
        let outcome = monitor.on_source_changed().await.unwrap();

        assert_eq!(
            outcome.batch,
            ActionBatch::Annotated(vec![PathBuf::from("0002.png")])
        );
        assert_eq!(monitor.tracker().action_count, 2);
        let session = fx.layout.case_snapshot_dir().join("session-1");
        assert_eq!(monitor.tracker().known_snapshots(&session).unwrap().len(), 2);
        assert_eq!(fx.output(), "page.a()\npage.b()\n    # - 0002.png\n\n");
    }

    #[tokio::test]
    async fn test_new_session_reusing_file_names_is_annotated() {
        let fx = Fixture::new("page.a()\n");
        fx.add_snapshot("session-1", "0001.png");
        let mut monitor = SnapshotMonitor::start(fx.layout.clone(), quick_config()).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        fx.add_snapshot("session-2", "0001.png");
        fx.append_source("page.b()\n");
        let outcome = monitor.on_source_changed().await.unwrap();

        assert_eq!(
            outcome.batch,
            ActionBatch::Annotated(vec![PathBuf::from("0001.png")])
        );
        let new_session = fx.layout.case_snapshot_dir().join("session-2");
        assert!(monitor.tracker().known_snapshots(&new_session).is_some());
        let old_session = fx.layout.case_snapshot_dir().join("session-1");
        assert!(monitor.tracker().known_snapshots(&old_session).is_none());
    }

    #[tokio::test]
    async fn test_timeout_advances_count_without_writing() {
        let fx = Fixture::new("page.a()\n");
        let mut monitor = SnapshotMonitor::start(fx.layout.clone(), quick_config()).unwrap();

        fx.append_source("page.b()\n");
        let outcome = monitor.on_source_changed().await.unwrap();

        assert_eq!(outcome.batch, ActionBatch::TimedOut);
        assert_eq!(monitor.tracker().action_count, 2);
        assert_eq!(fx.output(), "page.a()\n");

        // Not reconsidered on the next change.
        let outcome = monitor.on_source_changed().await.unwrap();
        assert_eq!(outcome.batch, ActionBatch::NoActions);
    }

    #[tokio::test]
    async fn test_actions_then_assertions_in_same_check() {
        let fx = Fixture::new("");
        let mut monitor = SnapshotMonitor::start(fx.layout.clone(), quick_config()).unwrap();

        fx.append_source("page.a()\nexpect(a)\n");
        fx.add_snapshot("session-1", "0001.png");
        let outcome = monitor.on_source_changed().await.unwrap();

        assert_eq!(outcome.new_actions, 1);
        assert_eq!(outcome.new_assertions, 1);
        assert_eq!(fx.output(), "page.a()\n    # - 0001.png\n\nexpect(a)\n");
    }

    #[tokio::test]
    async fn test_counts_survive_truncated_read() {
        let fx = Fixture::new("page.a()\nexpect(a)\n");
        let mut monitor = SnapshotMonitor::start(fx.layout.clone(), quick_config()).unwrap();

        fs::write(fx.layout.source_file(), "").unwrap();
        monitor.on_source_changed().await.unwrap();
        assert_eq!(monitor.tracker().action_count, 1);
        assert_eq!(monitor.tracker().assertion_count, 1);

        fs::write(fx.layout.source_file(), "page.a()\nexpect(a)\nexpect(b)\n").unwrap();
        let outcome = monitor.on_source_changed().await.unwrap();
        assert_eq!(outcome.new_assertions, 1);
        assert_eq!(fx.output(), "page.a()\nexpect(a)\nexpect(b)\n");
    }

    #[tokio::test]
    async fn test_missing_source_mid_run_is_error() {
        let fx = Fixture::new("page.a()\n");
        let mut monitor = SnapshotMonitor::start(fx.layout.clone(), quick_config()).unwrap();

        fs::remove_file(fx.layout.source_file()).unwrap();
        let err = monitor.on_source_changed().await.unwrap_err();
        assert!(!err.is_config_error());
        assert_eq!(monitor.tracker().action_count, 1);
    }

    #[tokio::test]
    async fn test_run_ignores_foreign_events_and_stops_on_shutdown() {
        let fx = Fixture::new("page.a()\n");
        let monitor = SnapshotMonitor::start(fx.layout.clone(), quick_config()).unwrap();

        let (tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(monitor.run(rx, async move {
            let _ = stop_rx.await;
        }));

        fx.append_source("expect(a)\n");
        tx.send(fx.layout.output_file()).await.unwrap();
        tx.send(fx.layout.source_file()).await.unwrap();

        let mut written = false;
        for _ in 0..100 {
            if fx.output().ends_with("expect(a)\n") {
                written = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(written, "assertion should reach the transcript");

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_run_ends_when_channel_closes() {
        let fx = Fixture::new("");
        let monitor = SnapshotMonitor::start(fx.layout.clone(), quick_config()).unwrap();

        let (tx, rx) = mpsc::channel::<PathBuf>(1);
        drop(tx);
        monitor
            .run(rx, std::future::pending::<()>())
            .await
            .unwrap();
    }
}
