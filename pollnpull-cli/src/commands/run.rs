//! `pollnpull run` — the long-running sync engine.

use anyhow::{Context, Result};
use clap::Args;

use pollnpull_daemon::start_blocking;

use super::ConfigArgs;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.resolve()?;
        let report = start_blocking(config).context("sync engine exited with error")?;
        println!(
            "stopped after {} cycle(s); {} new developer(s) persisted",
            report.cycles, report.persisted
        );
        Ok(())
    }
}
