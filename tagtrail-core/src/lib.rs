//! tagtrail core library — domain types, configuration, history store, errors.
//!
//! - [`types`] — entity records, location entries, the history log
//! - [`config`] — `~/.tagtrail/config.yaml` load / save
//! - [`history`] — change detection and the persisted history file
//! - [`error`] — [`ConfigError`], [`HistoryError`]

pub mod config;
pub mod error;
pub mod history;
pub mod types;

pub use config::{PollConfig, PublishConfig, TrackerConfig};
pub use error::{ConfigError, HistoryError};
pub use history::{HistoryStore, RecordOutcome};
pub use types::{
    normalize_timestamp, EntityRecord, HistoryLog, LocationCandidate, LocationEntry, TrackedName,
};
