//! Snapshot Monitor binary.
//!
//! Watches `input/records/{case}.py` while a recorded browser test runs and
//! writes `input/records/{case}_with_snapshots.py`, annotating each new
//! action with the snapshot files it produced.

use clap::error::ErrorKind;
use clap::Parser;
use snapshot_monitor_core::{CaseLayout, MonitorConfig};

#[derive(Parser)]
#[command(
    name = "snapshot-monitor",
    version,
    about = "Annotate recorded test actions with the snapshots they produce",
    after_help = "Example: snapshot-monitor 3574602"
)]
struct Cli {
    /// Test case identifier (the script is input/records/<CASE_ID>.py)
    case_id: String,

    #[clap(flatten)]
    common: monitor_common::CliArgs,

    /// Snapshot lookups per batch of new actions (overrides config)
    #[clap(long)]
    poll_attempts: Option<u32>,

    /// Delay between snapshot lookups in milliseconds (overrides config)
    #[clap(long)]
    poll_interval_ms: Option<u64>,
}

impl Cli {
    fn monitor_config(&self) -> snapshot_monitor_core::Result<MonitorConfig> {
        let mut config =
            MonitorConfig::resolve(self.common.config.as_deref(), &self.common.workspace_root)?;
        if let Some(attempts) = self.poll_attempts {
            config.poll_attempts = attempts;
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        config.ensure_valid()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    monitor_common::init_logging();

    let result = async {
        let config = cli.monitor_config()?;
        let layout = CaseLayout::from_workspace(&cli.common.workspace_root, cli.case_id.as_str());
        snapshot_monitor_core::start(layout, config, monitor_common::shutdown_signal()).await
    }
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_config_error() => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
