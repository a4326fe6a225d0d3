//! Error types for tagtrail-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or saving `~/.tagtrail/config.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading, writing, or renaming the config file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The config file exists but is not valid YAML for [`crate::config::TrackerConfig`].
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Errors from the persisted location history.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Reading, writing, or renaming the history file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The history file exists but cannot be parsed. There is no recovery.
    #[error("history file at {path} is corrupt: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The log could not be serialized (save path).
    #[error("history JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub(crate) fn config_io(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn history_io(path: impl Into<PathBuf>, source: std::io::Error) -> HistoryError {
    HistoryError::Io {
        path: path.into(),
        source,
    }
}
