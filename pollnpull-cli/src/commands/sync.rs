//! `pollnpull sync` — one synchronization cycle.

use anyhow::{Context, Result};
use clap::Args;

use pollnpull_daemon::{sync_blocking, SyncOutcome};

use super::ConfigArgs;

#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print the cycle summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.resolve()?;
        let outcome = sync_blocking(config).context("sync failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("failed to render summary JSON")?
            );
            return Ok(());
        }

        let summary = match outcome {
            SyncOutcome::Completed(summary) => summary,
            SyncOutcome::Cancelled => {
                println!("cancelled");
                return Ok(());
            }
        };
        if summary.rolled_back {
            println!("cancelled before the batch began; nothing persisted");
        } else if summary.fetched == 0 {
            println!("✓ up to date ({} known)", summary.known);
        } else {
            println!(
                "✓ {} new developer(s) persisted ({} failed, {} known before)",
                summary.persisted, summary.failed, summary.known
            );
        }
        Ok(())
    }
}
