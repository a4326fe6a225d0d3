use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Error surface for the poll loop and its external actions.
///
/// Only `History` and `Signal` stop the daemon. Everything else is
/// a transient failure of one cycle step and is logged by the loop.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// A file the loop depends on could not be accessed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external command could not be started.
    #[error("{step}: failed to spawn: {source}")]
    Spawn {
        step: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// An external command outlived its step timeout and was killed.
    #[error("{step}: timed out after {}s", .after.as_secs())]
    Timeout { step: &'static str, after: Duration },

    /// An external command exited non-zero.
    #[error("{step}: exited with {code}: {stderr}")]
    CommandFailed {
        step: &'static str,
        code: String,
        stderr: String,
    },

    /// The history file is unreadable or corrupt.
    #[error("history error: {0}")]
    History(#[from] tagtrail_core::HistoryError),

    /// The Ctrl-C handler could not be installed.
    #[error("signal handler failed: {0}")]
    Signal(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
