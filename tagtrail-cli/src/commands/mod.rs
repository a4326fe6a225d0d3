pub mod daemon;
pub mod extract;
pub mod history;
pub mod init;
pub mod items;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use tagtrail_core::{config, TrackerConfig};

pub(crate) fn home() -> Result<PathBuf> {
    config::home().context("could not determine home directory")
}

/// Load `~/.tagtrail/config.yaml` (defaults when absent) and apply the
/// per-run `--name` / `--history` overrides.
pub(crate) fn load_config(
    home: &Path,
    name: Option<String>,
    history: Option<PathBuf>,
) -> Result<TrackerConfig> {
    let mut cfg = config::load_at(home).with_context(|| {
        format!(
            "failed to load config at {}",
            config::config_path_at(home).display()
        )
    })?;
    if let Some(name) = name {
        cfg.tracked_name = name.into();
    }
    if let Some(history) = history {
        cfg.history_path = config::expand_home(&history, home);
    }
    Ok(cfg)
}

/// `YYYY-mm-dd HH:MM:SS` in local time for a seconds timestamp; `None` for 0.
pub(crate) fn format_last_seen(timestamp: f64) -> Option<String> {
    use chrono::{Local, TimeZone};

    if timestamp <= 0.0 || !timestamp.is_finite() {
        return None;
    }
    Local
        .timestamp_opt(timestamp.trunc() as i64, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

pub(crate) fn coord(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string())
}
