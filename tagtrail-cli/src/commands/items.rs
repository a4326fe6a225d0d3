//! `tagtrail items [--json]` — list every entity in the cache.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use tagtrail_core::types::place_label;
use tagtrail_core::EntityRecord;
use tagtrail_extract::{default_strategies, find_entity, pipeline, PlutilConverter};

/// List the items in the location cache without recording anything.
#[derive(Args, Debug)]
pub struct ItemsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "")]
    marker: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "lat")]
    latitude: String,
    #[tabled(rename = "lon")]
    longitude: String,
    #[tabled(rename = "place")]
    place: String,
}

impl ItemsArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let cfg = super::load_config(&home, None, None)?;
        let converter = PlutilConverter::new(&cfg.converter);
        let snapshot = pipeline::snapshot(&cfg, &converter, &default_strategies());

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&snapshot.entities)
                    .context("failed to serialize items JSON")?
            );
            return Ok(());
        }

        let Some(cache_path) = &snapshot.cache_path else {
            println!("Location cache not found. Checked:");
            for path in &snapshot.checked {
                println!("  - {}", path.display());
            }
            return Ok(());
        };
        if snapshot.loaded.is_none() {
            println!("{}", "Error: could not read the location cache.".red());
            println!(
                "Try running: {} -p '{}'",
                cfg.converter.display(),
                cache_path.display()
            );
            return Ok(());
        }
        if snapshot.entities.is_empty() {
            println!("No items found in cache.");
            return Ok(());
        }

        let tracked = find_entity(&snapshot.entities, &cfg.tracked_name.0);
        let rows: Vec<ItemRow> = snapshot
            .entities
            .iter()
            .map(|entity| row(entity, tracked.is_some_and(|t| std::ptr::eq(t, entity))))
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("{} = tracked ({})", "●".green(), cfg.tracked_name);
        Ok(())
    }
}

fn row(entity: &EntityRecord, tracked: bool) -> ItemRow {
    ItemRow {
        marker: if tracked {
            "●".green().to_string()
        } else {
            String::new()
        },
        name: entity.name.clone(),
        latitude: super::coord(entity.latitude),
        longitude: super::coord(entity.longitude),
        place: entity
            .address
            .as_ref()
            .and_then(place_label)
            .unwrap_or_default(),
    }
}
