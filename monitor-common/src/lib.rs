//! Shared bootstrap for the monitor binaries in this workspace.
//!
//! Binaries flatten `CliArgs` into their parser, call `init_logging()` once,
//! and hand `shutdown_signal()` to the monitor loop.

use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// CLI arguments shared across all monitor binaries.
#[derive(Debug, Clone, clap::Args)]
pub struct CliArgs {
    /// Project root containing `input/records` and `input/snapshot`
    #[clap(long, env = "SNAPSHOT_MONITOR_ROOT", default_value = ".")]
    pub workspace_root: PathBuf,

    /// Path to a TOML config file
    #[clap(long, env = "SNAPSHOT_MONITOR_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG`, falling back to `info`.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Resolves once the user interrupts the process (Ctrl+C).
///
/// If the signal handler cannot be installed the future never resolves, so
/// the caller keeps running instead of shutting down immediately.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Ctrl+C received, shutting down"),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await
        }
    }
}
