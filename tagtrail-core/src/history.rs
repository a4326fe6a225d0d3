//! Change detector and history store.
//!
//! Persists a [`HistoryLog`] JSON document (pretty-printed) at the configured
//! history path. The whole file is rewritten on every append, through the
//! same `.tmp` + rename pattern as the config file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;

use crate::error::{history_io, HistoryError};
use crate::types::{EntityRecord, HistoryLog, LocationCandidate, LocationEntry, TrackedName};

/// Result of offering the matched entity to the history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    /// The entity carried no latitude/longitude. Nothing was touched.
    NoLocationData,
    /// A new entry was appended; `total` counts it.
    Recorded { entry: LocationEntry, total: usize },
    /// Same coordinates as the last entry. Nothing was written.
    Unchanged {
        candidate: LocationCandidate,
        total: usize,
    },
}

impl RecordOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, RecordOutcome::Recorded { .. })
    }
}

impl HistoryLog {
    /// Append `entity`'s location if it differs from the last entry.
    ///
    /// Coordinates are compared with exact equality. Pure: no I/O.
    pub fn record_if_changed(
        &mut self,
        entity: &EntityRecord,
        now: DateTime<Local>,
    ) -> RecordOutcome {
        let Some(candidate) = LocationCandidate::from_entity(entity) else {
            return RecordOutcome::NoLocationData;
        };

        if let Some(last) = self.last() {
            if candidate.same_position(last) {
                return RecordOutcome::Unchanged {
                    candidate,
                    total: self.len(),
                };
            }
        }

        let entry = candidate.into_entry(format_recorded_at(now));
        self.locations.push(entry.clone());
        RecordOutcome::Recorded {
            entry,
            total: self.len(),
        }
    }
}

/// ISO-8601 local time with offset, microsecond precision.
pub fn format_recorded_at(now: DateTime<Local>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Owner of the history file. Exactly one writer is assumed.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    tracked_name: TrackedName,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, tracked_name: TrackedName) -> Self {
        Self {
            path: path.into(),
            tracked_name,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the log, or an empty one named after the tracked entity if the
    /// file does not exist yet. A corrupt file is `HistoryError::Parse`.
    pub fn load(&self) -> Result<HistoryLog, HistoryError> {
        load_at(&self.path, &self.tracked_name)
    }

    pub fn save(&self, log: &HistoryLog) -> Result<(), HistoryError> {
        save_at(&self.path, log)
    }

    /// Load, compare, and persist only when a new entry was appended.
    pub fn record_if_changed(
        &self,
        entity: &EntityRecord,
        now: DateTime<Local>,
    ) -> Result<RecordOutcome, HistoryError> {
        let mut log = self.load()?;
        let outcome = log.record_if_changed(entity, now);
        if outcome.is_recorded() {
            self.save(&log)?;
        }
        Ok(outcome)
    }
}

/// Load the history at `path`; missing file → empty log for `tracked_name`.
pub fn load_at(path: &Path, tracked_name: &TrackedName) -> Result<HistoryLog, HistoryError> {
    if !path.exists() {
        return Ok(HistoryLog::new(tracked_name.clone()));
    }
    let contents = std::fs::read_to_string(path).map_err(|e| history_io(path, e))?;
    serde_json::from_str(&contents).map_err(|source| HistoryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Overwrite the history at `path` with `log`.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(path: &Path, log: &HistoryLog) -> Result<(), HistoryError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| history_io(dir, e))?;
    }

    let json = serde_json::to_string_pretty(log)?;
    let tmp = tmp_path(path);
    std::fs::write(&tmp, json).map_err(|e| history_io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| history_io(path, e))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
