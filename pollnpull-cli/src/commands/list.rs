//! `pollnpull list` — print stored developers.

use anyhow::{Context, Result};
use clap::Args;

use pollnpull_sqlite::SqliteTarget;

use super::ConfigArgs;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit developers as a JSON array.
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let store = self.config.merged()?.store_location();
        let target = SqliteTarget::open(&store)
            .with_context(|| format!("failed to open store {}", store.display()))?;
        let developers = target.developers().context("failed to read developers")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&developers)
                    .context("failed to render developers JSON")?
            );
            return Ok(());
        }

        for dev in &developers {
            println!(
                "{}\t{}\t{}\t{}",
                dev.id,
                dev.full_name,
                dev.organization.as_deref().unwrap_or("-"),
                dev.contact_handle.as_deref().unwrap_or("-"),
            );
        }
        println!("{} developer(s) in {}", developers.len(), store.display());
        Ok(())
    }
}
