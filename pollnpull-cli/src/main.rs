//! pollnpull — poll a developer spreadsheet and append new rows to a SQLite store.
//!
//! # Usage
//!
//! ```text
//! pollnpull run  --sheet-id <ID> --credentials <FILE> [--store <PATH>] [--poll-interval <SECS>]
//! pollnpull sync --sheet-id <ID> --credentials <FILE> [--store <PATH>]
//! pollnpull list [--store <PATH>] [--json]
//! ```
//!
//! Every option may also come from a YAML file passed with `--config`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{list::ListArgs, run::RunArgs, sync::SyncArgs};

#[derive(Parser, Debug)]
#[command(
    name = "pollnpull",
    version,
    about = "Poll a developer spreadsheet and persist new records",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synchronize now, then every poll interval until interrupted.
    Run(RunArgs),

    /// Run exactly one synchronization cycle.
    Sync(SyncArgs),

    /// List the developers already in the store.
    List(ListArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::List(args) => args.run(),
    }
}
