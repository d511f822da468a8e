pub mod list;
pub mod run;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pollnpull_core::{Config, ConfigFile};

/// Options shared by every command that talks to the spreadsheet.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// YAML config file; command-line flags override its values.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Spreadsheet ID to poll.
    #[arg(long, value_name = "ID")]
    pub sheet_id: Option<String>,

    /// Google Cloud service-account JSON key.
    #[arg(long, visible_alias = "gcloud-creds", value_name = "FILE")]
    pub credentials: Option<PathBuf>,

    /// SQLite database file [default: db.sqlite3].
    #[arg(long, visible_alias = "sqlite3-db", value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Seconds between polls [default: 30].
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Range to read, in A1 or R1C1 notation [default: Sheet1!R2C1:C4].
    #[arg(long, value_name = "RANGE")]
    pub range: Option<String>,
}

impl ConfigArgs {
    /// File values (if any) overlaid with the flags, not yet validated.
    pub fn merged(&self) -> Result<ConfigFile> {
        let file = match &self.config {
            Some(path) => ConfigFile::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ConfigFile::default(),
        };
        Ok(file.merge(ConfigFile {
            source_identifier: self.sheet_id.clone(),
            credentials_path: self.credentials.clone(),
            store_location: self.store.clone(),
            poll_interval_secs: self.poll_interval,
            sheet_range: self.range.clone(),
        }))
    }

    pub fn resolve(&self) -> Result<Config> {
        self.merged()?.resolve().context("invalid configuration")
    }
}
