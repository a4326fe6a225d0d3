//! External side effects of a poll cycle.
//!
//! The loop only talks to the outside world through [`CycleActions`], so
//! tests drive it with a scripted double and a paused clock.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use tagtrail_core::{PublishConfig, TrackerConfig};

use crate::error::{io_err, DaemonError};
use crate::publish::{publish_history, PublishOutcome};

pub const FIND_MY_APP: &str = "FindMy";
const HIDE_SCRIPT: &str =
    r#"tell application "System Events" to set visible of process "FindMy" to false"#;
const HIDE_TIMEOUT: Duration = Duration::from_secs(5);

/// Captured output of one subordinate extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractorOutput {
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait CycleActions: Send {
    /// Ask the location app to refresh its cache. Best effort.
    async fn refresh_cache(&mut self) -> Result<(), DaemonError>;

    /// Fallback when refresh fails: list the cache directory.
    async fn nudge_cache_dir(&mut self) -> Result<(), DaemonError>;

    /// Hide the refreshed app again. Failure is ignored by the loop.
    async fn hide_app(&mut self) -> Result<(), DaemonError>;

    /// Run `tagtrail extract` as a separate process and capture its output.
    async fn run_extractor(&mut self) -> Result<ExtractorOutput, DaemonError>;

    /// Commit and push the history file.
    async fn publish(&mut self, message: &str) -> Result<PublishOutcome, DaemonError>;
}

// ---------------------------------------------------------------------------
// Real implementation
// ---------------------------------------------------------------------------

/// macOS actions: `open`, `osascript`, the subordinate extractor, and git.
#[derive(Debug, Clone)]
pub struct SystemActions {
    extractor: PathBuf,
    extractor_args: Vec<OsString>,
    cache_dir: Option<PathBuf>,
    history_path: PathBuf,
    refresh_timeout: Duration,
    extract_timeout: Duration,
    publish: PublishConfig,
}

impl SystemActions {
    /// `extractor` is the `tagtrail` binary; it is run as
    /// `<extractor> extract --name <name> --history <path>`.
    pub fn new(config: &TrackerConfig, extractor: impl Into<PathBuf>) -> Self {
        let extractor_args = vec![
            OsString::from("extract"),
            OsString::from("--name"),
            OsString::from(&config.tracked_name.0),
            OsString::from("--history"),
            config.history_path.clone().into_os_string(),
        ];
        Self {
            extractor: extractor.into(),
            extractor_args,
            cache_dir: config.cache_dir().map(Path::to_path_buf),
            history_path: config.history_path.clone(),
            refresh_timeout: config.poll.refresh_timeout(),
            extract_timeout: config.poll.extract_timeout(),
            publish: config.publish.clone(),
        }
    }
}

#[async_trait]
impl CycleActions for SystemActions {
    async fn refresh_cache(&mut self) -> Result<(), DaemonError> {
        let mut command = Command::new("open");
        command.args(["-g", "-a", FIND_MY_APP]);
        run_checked(command, "refresh", self.refresh_timeout).await?;
        Ok(())
    }

    async fn nudge_cache_dir(&mut self) -> Result<(), DaemonError> {
        let Some(dir) = &self.cache_dir else {
            return Ok(());
        };
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| io_err(dir, e))?;
        let mut count = 0usize;
        while entries
            .next_entry()
            .await
            .map_err(|e| io_err(dir, e))?
            .is_some()
        {
            count += 1;
        }
        tracing::debug!(dir = %dir.display(), entries = count, "listed cache directory");
        Ok(())
    }

    async fn hide_app(&mut self) -> Result<(), DaemonError> {
        let mut command = Command::new("osascript");
        command.args(["-e", HIDE_SCRIPT]);
        run_checked(command, "hide", HIDE_TIMEOUT).await?;
        Ok(())
    }

    async fn run_extractor(&mut self) -> Result<ExtractorOutput, DaemonError> {
        let mut command = Command::new(&self.extractor);
        command.args(&self.extractor_args);
        let output = run_with_timeout(command, "extract", self.extract_timeout).await?;
        Ok(ExtractorOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn publish(&mut self, message: &str) -> Result<PublishOutcome, DaemonError> {
        publish_history(&self.history_path, message, &self.publish).await
    }
}

// ---------------------------------------------------------------------------
// Process helpers
// ---------------------------------------------------------------------------

/// Spawn `command` with captured output and wait at most `limit`.
///
/// On timeout the child is killed when its handle drops.
pub async fn run_with_timeout(
    mut command: Command,
    step: &'static str,
    limit: Duration,
) -> Result<Output, DaemonError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command
        .spawn()
        .map_err(|source| DaemonError::Spawn { step, source })?;

    match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| DaemonError::Spawn { step, source }),
        Err(_) => Err(DaemonError::Timeout { step, after: limit }),
    }
}

/// Like [`run_with_timeout`], but a non-zero exit is an error.
pub async fn run_checked(
    command: Command,
    step: &'static str,
    limit: Duration,
) -> Result<Output, DaemonError> {
    let output = run_with_timeout(command, step, limit).await?;
    if output.status.success() {
        return Ok(output);
    }
    Err(DaemonError::CommandFailed {
        step,
        code: exit_code(&output),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

pub(crate) fn exit_code(output: &Output) -> String {
    output
        .status
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}
