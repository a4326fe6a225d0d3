//! Error types for tagtrail-extract.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use tagtrail_core::HistoryError;

/// Errors from converting, loading, and recording a location cache.
///
/// Converter failures are expected and swallowed by the loader chain; only
/// [`ExtractError::History`] is fatal to an extraction run.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The converter program could not be spawned.
    #[error("failed to run converter {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converter ran but exited non-zero.
    #[error("converter {program} exited with {status}: {stderr}")]
    ConverterFailed {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    /// Structured-mode output was not valid JSON.
    #[error("converter output is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A dump file could not be written.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted history could not be read or written.
    #[error(transparent)]
    History(#[from] HistoryError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ExtractError {
    ExtractError::Io {
        path: path.into(),
        source,
    }
}
