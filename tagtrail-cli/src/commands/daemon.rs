//! `tagtrail daemon start [--interval SECS] [--once]`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use tagtrail_daemon::{start_blocking, DaemonOptions};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the poll loop in the foreground until Ctrl-C.
    Start(DaemonStartArgs),
}

#[derive(Args, Debug)]
pub struct DaemonStartArgs {
    /// Seconds between checks (overrides config).
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Run a single check and exit.
    #[arg(long)]
    pub once: bool,

    /// Log as JSON lines instead of the compact format.
    #[arg(long)]
    pub json_logs: bool,
}

pub fn run(command: DaemonCommand) -> Result<()> {
    let home = super::home()?;

    match command {
        DaemonCommand::Start(args) => {
            let mut cfg = super::load_config(&home, None, None)?;
            if let Some(interval) = args.interval {
                cfg.poll.interval_secs = interval;
            }
            let extractor =
                std::env::current_exe().context("could not locate the tagtrail executable")?;
            let options = DaemonOptions {
                extractor,
                once: args.once,
                json_logs: args.json_logs,
            };
            start_blocking(cfg, options).context("daemon exited with error")?;
        }
    }
    Ok(())
}
