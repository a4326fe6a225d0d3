//! Extraction pipeline: locate → load → parse → match → record.
//!
//! This is the canonical extraction entrypoint for `tagtrail extract`, which
//! the daemon runs as its per-cycle subordinate process.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use tagtrail_core::{EntityRecord, HistoryStore, RecordOutcome, TrackerConfig};

use crate::error::{io_err, ExtractError};
use crate::loader::{load_cache, Converter, LoadedCache, LoaderStrategy};
use crate::locator::locate_cache;
use crate::matcher::find_entity;
use crate::structured::extract_entities;
use crate::text_dump::parse_text_dump;

/// Everything read from the cache in one pass, before matching.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    /// Candidates that were checked, in priority order.
    pub checked: Vec<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub loaded: Option<LoadedCache>,
    pub entities: Vec<EntityRecord>,
}

/// How an extraction run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractOutcome {
    CacheNotFound,
    /// Every loader strategy failed.
    CacheUnreadable,
    NoEntities,
    TargetNotFound,
    Record(RecordOutcome),
}

#[derive(Debug, Clone)]
pub struct ExtractReport {
    pub snapshot: CacheSnapshot,
    pub history_path: PathBuf,
    pub outcome: ExtractOutcome,
}

impl ExtractReport {
    /// The entity the tracked name resolved to, if any.
    pub fn matched<'a>(&'a self, config: &TrackerConfig) -> Option<&'a EntityRecord> {
        find_entity(&self.snapshot.entities, &config.tracked_name.0)
    }
}

/// Turn loaded converter output into entity records.
pub fn entities_from(loaded: &LoadedCache) -> Vec<EntityRecord> {
    match loaded {
        LoadedCache::Structured(value) => extract_entities(value),
        LoadedCache::TextDump(text) => parse_text_dump(text),
    }
}

/// Write the raw converter output to `path` for offline inspection.
///
/// Structured output is pretty-printed; a text dump is written verbatim.
pub fn write_dump(loaded: &LoadedCache, path: &Path) -> Result<(), ExtractError> {
    let body = match loaded {
        LoadedCache::Structured(value) => serde_json::to_string_pretty(value)?,
        LoadedCache::TextDump(text) => text.clone(),
    };
    std::fs::write(path, body).map_err(|e| io_err(path, e))
}

/// Locate, load and parse the cache without touching the history.
pub fn snapshot(
    config: &TrackerConfig,
    converter: &dyn Converter,
    strategies: &[Box<dyn LoaderStrategy>],
) -> CacheSnapshot {
    let checked = config.cache_candidates.clone();
    let Some(cache_path) = locate_cache(&checked) else {
        return CacheSnapshot {
            checked,
            cache_path: None,
            loaded: None,
            entities: Vec::new(),
        };
    };

    let loaded = load_cache(&cache_path, converter, strategies);
    let entities = loaded.as_ref().map(entities_from).unwrap_or_default();
    tracing::debug!(
        path = %cache_path.display(),
        format = ?loaded.as_ref().map(LoadedCache::format),
        entities = entities.len(),
        "cache snapshot taken",
    );

    CacheSnapshot {
        checked,
        cache_path: Some(cache_path),
        loaded,
        entities,
    }
}

/// Run one extraction against the live clock.
pub fn run(
    config: &TrackerConfig,
    converter: &dyn Converter,
    strategies: &[Box<dyn LoaderStrategy>],
) -> Result<ExtractReport, ExtractError> {
    run_at(config, converter, strategies, Local::now())
}

/// Run one extraction, stamping any new entry with `now`.
///
/// Unavailable input ends the run with an [`ExtractOutcome`] and no mutation.
/// Only history I/O or a corrupt history file is an error.
pub fn run_at(
    config: &TrackerConfig,
    converter: &dyn Converter,
    strategies: &[Box<dyn LoaderStrategy>],
    now: DateTime<Local>,
) -> Result<ExtractReport, ExtractError> {
    let snapshot = snapshot(config, converter, strategies);
    let store = HistoryStore::new(&config.history_path, config.tracked_name.clone());

    let outcome = if snapshot.cache_path.is_none() {
        ExtractOutcome::CacheNotFound
    } else if snapshot.loaded.is_none() {
        ExtractOutcome::CacheUnreadable
    } else if snapshot.entities.is_empty() {
        ExtractOutcome::NoEntities
    } else {
        match find_entity(&snapshot.entities, &config.tracked_name.0) {
            None => ExtractOutcome::TargetNotFound,
            Some(entity) => ExtractOutcome::Record(store.record_if_changed(entity, now)?),
        }
    };

    Ok(ExtractReport {
        snapshot,
        history_path: config.history_path.clone(),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;
    use crate::loader::{default_strategies, CacheFormat};

    struct CannedConverter(Option<String>);

    impl Converter for CannedConverter {
        fn convert(&self, _artifact: &Path, format: CacheFormat) -> Result<String, ExtractError> {
            match (format, &self.0) {
                (CacheFormat::Structured, Some(json)) => Ok(json.clone()),
                _ => Err(ExtractError::Spawn {
                    program: PathBuf::from("canned"),
                    source: std::io::Error::other("no output"),
                }),
            }
        }
    }

    fn config_with_cache(dir: &TempDir) -> TrackerConfig {
        let mut config = TrackerConfig::defaults_at(dir.path());
        let cache = dir.path().join("Items.data");
        std::fs::write(&cache, b"bplist00").unwrap();
        config.cache_candidates = vec![cache];
        config.history_path = dir.path().join("location_history.json");
        config.tracked_name = "LYRIQ".into();
        config
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn missing_cache_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let config = TrackerConfig::defaults_at(dir.path());
        let report = run_at(&config, &CannedConverter(None), &default_strategies(), now())
            .expect("run");
        assert_eq!(report.outcome, ExtractOutcome::CacheNotFound);
        assert_eq!(report.snapshot.checked.len(), 2);
    }

    #[test]
    fn unreadable_cache_when_converter_fails() {
        let dir = TempDir::new().unwrap();
        let config = config_with_cache(&dir);
        let report = run_at(&config, &CannedConverter(None), &default_strategies(), now())
            .expect("run");
        assert_eq!(report.outcome, ExtractOutcome::CacheUnreadable);
        assert!(!config.history_path.exists());
    }

    #[test]
    fn empty_array_means_no_entities() {
        let dir = TempDir::new().unwrap();
        let config = config_with_cache(&dir);
        let converter = CannedConverter(Some("[]".into()));
        let report = run_at(&config, &converter, &default_strategies(), now()).expect("run");
        assert_eq!(report.outcome, ExtractOutcome::NoEntities);
    }

    #[test]
    fn unknown_target_is_reported() {
        let dir = TempDir::new().unwrap();
        let config = config_with_cache(&dir);
        let converter = CannedConverter(Some(r#"[{"name":"Keys"}]"#.into()));
        let report = run_at(&config, &converter, &default_strategies(), now()).expect("run");
        assert_eq!(report.outcome, ExtractOutcome::TargetNotFound);
    }

    #[test]
    fn target_without_location_is_not_recorded() {
        let dir = TempDir::new().unwrap();
        let config = config_with_cache(&dir);
        let converter = CannedConverter(Some(r#"[{"name":"ERAUBCU LYRIQ"}]"#.into()));
        let report = run_at(&config, &converter, &default_strategies(), now()).expect("run");
        assert_eq!(
            report.outcome,
            ExtractOutcome::Record(RecordOutcome::NoLocationData)
        );
        assert!(!config.history_path.exists());
    }

    #[test]
    fn located_target_is_recorded_then_unchanged() {
        let dir = TempDir::new().unwrap();
        let config = config_with_cache(&dir);
        let converter = CannedConverter(Some(
            r#"[{"name":"ERAUBCU LYRIQ","location":{"latitude":40.0,"longitude":-73.0}}]"#.into(),
        ));

        let first = run_at(&config, &converter, &default_strategies(), now()).expect("first");
        assert!(matches!(
            first.outcome,
            ExtractOutcome::Record(RecordOutcome::Recorded { total: 1, .. })
        ));
        assert_eq!(
            first.matched(&config).map(|e| e.name.as_str()),
            Some("ERAUBCU LYRIQ")
        );

        let second = run_at(&config, &converter, &default_strategies(), now()).expect("second");
        assert!(matches!(
            second.outcome,
            ExtractOutcome::Record(RecordOutcome::Unchanged { total: 1, .. })
        ));
    }

    #[test]
    fn dump_writes_pretty_json_and_raw_text() {
        let dir = TempDir::new().unwrap();
        let json_path = dir.path().join("cache.json");
        let text_path = dir.path().join("cache.txt");

        write_dump(
            &LoadedCache::Structured(serde_json::json!([{"name": "Keys"}])),
            &json_path,
        )
        .expect("json dump");
        write_dump(&LoadedCache::TextDump("\"name\" => \"Keys\"".into()), &text_path)
            .expect("text dump");

        let json = std::fs::read_to_string(&json_path).unwrap();
        assert!(json.starts_with("[\n"), "pretty-printed: {json}");
        assert_eq!(
            std::fs::read_to_string(&text_path).unwrap(),
            "\"name\" => \"Keys\""
        );
    }

    #[test]
    fn dump_into_missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = write_dump(
            &LoadedCache::TextDump(String::new()),
            &dir.path().join("nope").join("cache.txt"),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }

    #[test]
    fn corrupt_history_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = config_with_cache(&dir);
        std::fs::write(&config.history_path, "[").unwrap();
        let converter = CannedConverter(Some(
            r#"[{"name":"LYRIQ","location":{"latitude":1.0,"longitude":2.0}}]"#.into(),
        ));

        let err = run_at(&config, &converter, &default_strategies(), now()).unwrap_err();
        assert!(matches!(err, ExtractError::History(_)));
    }
}
