//! `tagtrail init [--name N] [--history PATH] [--converter PROG] [--publish] [--force]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use tagtrail_core::{config, TrackerConfig};

/// Write `~/.tagtrail/config.yaml`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Name of the tracked item as shown in the location app.
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Where the location history JSON is kept.
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Program used to convert the cache (default: plutil).
    #[arg(long)]
    pub converter: Option<PathBuf>,

    /// Commit and push the history file after each new location.
    #[arg(long)]
    pub publish: bool,

    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let path = config::config_path_at(&home);
        if path.exists() && !self.force {
            bail!(
                "config already exists at {} (use --force to overwrite)",
                path.display()
            );
        }

        let mut cfg = TrackerConfig::defaults_at(&home);
        if let Some(name) = self.name {
            cfg.tracked_name = name.into();
        }
        if let Some(history) = self.history {
            cfg.history_path = config::expand_home(&history, &home);
        }
        if let Some(converter) = self.converter {
            cfg.converter = converter;
        }
        cfg.publish.enabled = self.publish;

        let saved = config::save_at(&home, &cfg)
            .with_context(|| format!("failed to write config at {}", path.display()))?;

        println!("✓ Tracking '{}'", cfg.tracked_name);
        println!("  Config:  {}", saved.display());
        println!("  History: {}", cfg.history_path.display());
        if cfg.publish.enabled {
            println!("  Publishing enabled (git add/commit/push after each new location)");
        }
        Ok(())
    }
}
