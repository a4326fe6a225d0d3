//! Cache loader: converter invocation and the structured → text-dump chain.
//!
//! Strategies are tried in order and the first success wins, so another
//! converter mode can be added without touching callers.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

use crate::error::ExtractError;

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// The two output shapes the converter can produce for the same artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFormat {
    Structured,
    TextDump,
}

impl fmt::Display for CacheFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheFormat::Structured => write!(f, "structured"),
            CacheFormat::TextDump => write!(f, "text-dump"),
        }
    }
}

/// External program that turns the opaque cache into text.
pub trait Converter {
    /// Exit code 0 + stdout is success; anything else is an error.
    fn convert(&self, artifact: &Path, format: CacheFormat) -> Result<String, ExtractError>;
}

/// `plutil -convert json -o - <path>` / `plutil -p <path>`.
#[derive(Debug, Clone)]
pub struct PlutilConverter {
    program: PathBuf,
}

impl PlutilConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(artifact: &Path, format: CacheFormat) -> Vec<&OsStr> {
        let artifact = artifact.as_os_str();
        match format {
            CacheFormat::Structured => vec![
                OsStr::new("-convert"),
                OsStr::new("json"),
                OsStr::new("-o"),
                OsStr::new("-"),
                artifact,
            ],
            CacheFormat::TextDump => vec![OsStr::new("-p"), artifact],
        }
    }
}

impl Converter for PlutilConverter {
    fn convert(&self, artifact: &Path, format: CacheFormat) -> Result<String, ExtractError> {
        let output = Command::new(&self.program)
            .args(Self::args(artifact, format))
            .output()
            .map_err(|source| ExtractError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractError::ConverterFailed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ---------------------------------------------------------------------------
// Loader strategies
// ---------------------------------------------------------------------------

/// Raw converter output, tagged by the mode that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedCache {
    Structured(Value),
    TextDump(String),
}

impl LoadedCache {
    pub fn format(&self) -> CacheFormat {
        match self {
            LoadedCache::Structured(_) => CacheFormat::Structured,
            LoadedCache::TextDump(_) => CacheFormat::TextDump,
        }
    }

    /// At most `limit` characters of the raw output, for operator diagnostics.
    pub fn preview(&self, limit: usize) -> String {
        let text = match self {
            LoadedCache::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            LoadedCache::TextDump(text) => text.clone(),
        };
        text.chars().take(limit).collect()
    }
}

/// One way of turning a cache artifact into a [`LoadedCache`].
pub trait LoaderStrategy {
    fn format(&self) -> CacheFormat;
    fn load(&self, converter: &dyn Converter, artifact: &Path) -> Result<LoadedCache, ExtractError>;
}

/// Converter in structured mode, output parsed as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredStrategy;

impl LoaderStrategy for StructuredStrategy {
    fn format(&self) -> CacheFormat {
        CacheFormat::Structured
    }

    fn load(&self, converter: &dyn Converter, artifact: &Path) -> Result<LoadedCache, ExtractError> {
        let stdout = converter.convert(artifact, CacheFormat::Structured)?;
        Ok(LoadedCache::Structured(serde_json::from_str(&stdout)?))
    }
}

/// Converter in text-dump mode, output kept verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextDumpStrategy;

impl LoaderStrategy for TextDumpStrategy {
    fn format(&self) -> CacheFormat {
        CacheFormat::TextDump
    }

    fn load(&self, converter: &dyn Converter, artifact: &Path) -> Result<LoadedCache, ExtractError> {
        converter
            .convert(artifact, CacheFormat::TextDump)
            .map(LoadedCache::TextDump)
    }
}

/// Structured first, text dump as fallback.
pub fn default_strategies() -> Vec<Box<dyn LoaderStrategy>> {
    vec![Box::new(StructuredStrategy), Box::new(TextDumpStrategy)]
}

/// Try each strategy in order; `None` means no data this cycle.
pub fn load_cache(
    artifact: &Path,
    converter: &dyn Converter,
    strategies: &[Box<dyn LoaderStrategy>],
) -> Option<LoadedCache> {
    for strategy in strategies {
        match strategy.load(converter, artifact) {
            Ok(loaded) => return Some(loaded),
            Err(err) => {
                tracing::debug!(
                    format = %strategy.format(),
                    path = %artifact.display(),
                    error = %err,
                    "cache load strategy failed",
                );
            }
        }
    }
    None
}
