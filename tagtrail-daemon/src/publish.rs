//! Publisher: commit and push the history file after a new location.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::process::Command;

use tagtrail_core::{PublishConfig, TrackedName};

use crate::actions::{exit_code, run_with_timeout};
use crate::error::DaemonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// `git commit` found nothing staged. Not an error.
    NothingToCommit,
    /// Publishing is disabled in config.
    Skipped,
}

/// `Update <name> location - YYYY-mm-dd HH:MM:SS`
pub fn commit_message(name: &TrackedName, now: DateTime<Local>) -> String {
    format!("Update {name} location - {}", now.format("%Y-%m-%d %H:%M:%S"))
}

/// `git add <file>`, `git commit -m <message>`, `git push`, run in the
/// history file's directory. Each step has its own timeout.
pub async fn publish_history(
    history_path: &Path,
    message: &str,
    config: &PublishConfig,
) -> Result<PublishOutcome, DaemonError> {
    if !config.enabled {
        return Ok(PublishOutcome::Skipped);
    }

    let workdir = history_path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file = history_path.file_name().unwrap_or(history_path.as_os_str());

    let add = git(workdir, "git add", Duration::from_secs(config.add_timeout_secs), |c| {
        c.arg("add").arg(file);
    })
    .await?;
    ensure_success("git add", &add)?;

    let commit = git(
        workdir,
        "git commit",
        Duration::from_secs(config.commit_timeout_secs),
        |c| {
            c.args(["commit", "-m", message]);
        },
    )
    .await?;
    if !commit.status.success() {
        if is_nothing_to_commit(&commit) {
            tracing::info!("history unchanged in git, nothing to commit");
            return Ok(PublishOutcome::NothingToCommit);
        }
        ensure_success("git commit", &commit)?;
    }

    let push = git(workdir, "git push", Duration::from_secs(config.push_timeout_secs), |c| {
        c.arg("push");
    })
    .await?;
    ensure_success("git push", &push)?;

    tracing::info!(commit = message, "history published");
    Ok(PublishOutcome::Published)
}

async fn git(
    workdir: &Path,
    step: &'static str,
    limit: Duration,
    configure: impl FnOnce(&mut Command),
) -> Result<std::process::Output, DaemonError> {
    let mut command = Command::new("git");
    command.current_dir(workdir);
    configure(&mut command);
    run_with_timeout(command, step, limit).await
}

fn ensure_success(step: &'static str, output: &std::process::Output) -> Result<(), DaemonError> {
    if output.status.success() {
        return Ok(());
    }
    Err(DaemonError::CommandFailed {
        step,
        code: exit_code(output),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// git prints "nothing to commit" on stdout; some versions use stderr.
fn is_nothing_to_commit(output: &std::process::Output) -> bool {
    let needle = "nothing to commit";
    String::from_utf8_lossy(&output.stdout).contains(needle)
        || String::from_utf8_lossy(&output.stderr).contains(needle)
}
