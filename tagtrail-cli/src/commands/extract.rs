//! `tagtrail extract [--name N] [--history PATH] [--dump-cache PATH]`
//!
//! One extraction cycle with operator narration on stdout. The daemon runs
//! this as a subordinate process and classifies the narration by marker.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{Map, Value};

use tagtrail_core::types::place_label;
use tagtrail_core::{RecordOutcome, TrackerConfig};
use tagtrail_extract::{
    default_strategies, pipeline, write_dump, ExtractOutcome, ExtractReport, PlutilConverter,
};

const PREVIEW_CHARS: usize = 2000;

/// Run one extraction and record the tracked item's location if it moved.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Name of the tracked item (overrides config).
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// History file (overrides config).
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Also write the raw converter output to this file.
    #[arg(long, value_name = "PATH")]
    pub dump_cache: Option<PathBuf>,
}

impl ExtractArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let cfg = super::load_config(&home, self.name, self.history)?;
        let converter = PlutilConverter::new(&cfg.converter);

        println!("Looking for: {}", cfg.tracked_name);
        println!("{}", "=".repeat(50));

        let report = pipeline::run(&cfg, &converter, &default_strategies()).with_context(|| {
            format!(
                "failed to record location in {}",
                cfg.history_path.display()
            )
        })?;

        if let (Some(path), Some(loaded)) = (&self.dump_cache, &report.snapshot.loaded) {
            write_dump(loaded, path)
                .with_context(|| format!("failed to write cache dump to {}", path.display()))?;
            println!("Full cache saved to: {}", path.display());
        }

        narrate(&cfg, &report);
        Ok(())
    }
}

fn narrate(cfg: &TrackerConfig, report: &ExtractReport) {
    let snapshot = &report.snapshot;

    let Some(cache_path) = &snapshot.cache_path else {
        println!("\n{}", "Error: location cache not found!".red());
        println!("Checked locations:");
        for path in &snapshot.checked {
            println!("  - {}", path.display());
        }
        println!("\nMake sure you're signed into iCloud with Find My enabled.");
        println!("Try opening the Find My app to refresh the cache.");
        return;
    };
    println!("Found cache: {}", cache_path.display());

    let Some(loaded) = &snapshot.loaded else {
        println!("\n{}", "Error: could not read the location cache.".red());
        println!(
            "Try running: {} -p '{}'",
            cfg.converter.display(),
            cache_path.display()
        );
        return;
    };
    println!("Cache format: {}", loaded.format());

    if snapshot.entities.is_empty() {
        println!("\nNo items found in cache. Raw output preview:");
        println!("{}", loaded.preview(PREVIEW_CHARS));
        return;
    }

    println!("\nFound {} items in Find My:", snapshot.entities.len());
    for entity in &snapshot.entities {
        println!(
            "  - {}: ({}, {})",
            entity.name,
            super::coord(entity.latitude),
            super::coord(entity.longitude)
        );
    }

    match &report.outcome {
        ExtractOutcome::TargetNotFound => {
            println!(
                "\n{}",
                format!("Error: could not find an item named '{}'", cfg.tracked_name).red()
            );
            println!("Set tracked_name in ~/.tagtrail/config.yaml to one of the names above.");
        }
        ExtractOutcome::Record(RecordOutcome::NoLocationData) => {
            println!("\nNo location data available for {}", cfg.tracked_name);
        }
        ExtractOutcome::Record(RecordOutcome::Recorded { entry, total }) => {
            println!("\n{}", "✓ New location recorded!".green());
            print_current(
                entry.latitude,
                entry.longitude,
                entry.accuracy,
                entry.timestamp,
                &entry.address,
            );
            print_totals(*total, report);
        }
        ExtractOutcome::Record(RecordOutcome::Unchanged { candidate, total }) => {
            println!("\n{}", "○ Location unchanged since last check".yellow());
            print_current(
                candidate.latitude,
                candidate.longitude,
                candidate.accuracy,
                candidate.timestamp,
                &candidate.address,
            );
            print_totals(*total, report);
        }
        // Handled by the early returns above.
        ExtractOutcome::CacheNotFound
        | ExtractOutcome::CacheUnreadable
        | ExtractOutcome::NoEntities => {}
    }
}

fn print_current(
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
    timestamp: f64,
    address: &Map<String, Value>,
) {
    println!("\nCurrent location:");
    println!("  Lat: {latitude}");
    println!("  Lon: {longitude}");
    if let Some(accuracy) = accuracy.filter(|a| *a != 0.0) {
        println!("  Accuracy: {accuracy}m");
    }
    if let Some(place) = place_label(address) {
        println!("  Location: {place}");
    }
    if let Some(seen) = super::format_last_seen(timestamp) {
        println!("  Last seen: {seen}");
    }
}

fn print_totals(total: usize, report: &ExtractReport) {
    println!("\nTotal locations recorded: {total}");
    println!("History saved to: {}", report.history_path.display());
}
