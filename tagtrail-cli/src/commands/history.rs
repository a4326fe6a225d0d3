//! `tagtrail history [--limit N] [--json]`

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use tagtrail_core::{HistoryStore, LocationEntry};

/// Show recorded locations, oldest first.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Only show the most recent N entries.
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "recorded at")]
    recorded_at: String,
    #[tabled(rename = "lat")]
    latitude: f64,
    #[tabled(rename = "lon")]
    longitude: f64,
    #[tabled(rename = "accuracy")]
    accuracy: String,
    #[tabled(rename = "place")]
    place: String,
    #[tabled(rename = "last seen")]
    last_seen: String,
}

impl HistoryArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let cfg = super::load_config(&home, None, None)?;
        let store = HistoryStore::new(&cfg.history_path, cfg.tracked_name.clone());
        let log = store
            .load()
            .with_context(|| format!("failed to load history at {}", store.path().display()))?;

        let skip = self
            .limit
            .map(|limit| log.len().saturating_sub(limit))
            .unwrap_or(0);
        let shown = &log.locations[skip..];

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(shown).context("failed to serialize history JSON")?
            );
            return Ok(());
        }

        if log.is_empty() {
            println!("No locations recorded yet for '{}'.", log.tracked_name);
            println!("History file: {}", store.path().display());
            return Ok(());
        }

        let rows: Vec<HistoryRow> = shown
            .iter()
            .enumerate()
            .map(|(i, entry)| row(skip + i + 1, entry))
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!(
            "{} | {} of {} locations",
            log.tracked_name,
            shown.len(),
            log.len()
        );
        println!("{table}");
        Ok(())
    }
}

fn row(index: usize, entry: &LocationEntry) -> HistoryRow {
    HistoryRow {
        index,
        recorded_at: entry.recorded_at.clone(),
        latitude: entry.latitude,
        longitude: entry.longitude,
        accuracy: entry
            .accuracy
            .map(|a| format!("{a}m"))
            .unwrap_or_default(),
        place: entry.place_label().unwrap_or_default(),
        last_seen: super::format_last_seen(entry.timestamp).unwrap_or_default(),
    }
}
