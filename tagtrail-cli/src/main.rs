//! tagtrail — location history for a tracked Find My item.
//!
//! # Usage
//!
//! ```text
//! tagtrail init [--name <name>] [--history <path>] [--converter <prog>] [--publish] [--force]
//! tagtrail extract [--name <name>] [--history <path>] [--dump-cache <path>]
//! tagtrail items [--json]
//! tagtrail history [--limit <n>] [--json]
//! tagtrail daemon start [--interval <secs>] [--once] [--json-logs]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    daemon::DaemonCommand, extract::ExtractArgs, history::HistoryArgs, init::InitArgs,
    items::ItemsArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tagtrail",
    version,
    about = "Record the location history of a Find My item",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write ~/.tagtrail/config.yaml.
    Init(InitArgs),

    /// Read the cache once and record the item's location if it moved.
    Extract(ExtractArgs),

    /// List every item in the cache.
    Items(ItemsArgs),

    /// Show recorded locations.
    History(HistoryArgs),

    /// Run the periodic poll loop.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    // The daemon installs its own subscriber at `info`.
    if !matches!(cli.command, Commands::Daemon { .. }) {
        tagtrail_daemon::init_tracing("warn", false);
    }
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Extract(args) => args.run(),
        Commands::Items(args) => args.run(),
        Commands::History(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}
