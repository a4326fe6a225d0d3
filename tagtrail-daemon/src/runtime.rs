use std::future::Future;
use std::path::PathBuf;

use chrono::Local;

use tagtrail_core::{HistoryStore, TrackerConfig};

use crate::actions::{CycleActions, ExtractorOutput, SystemActions};
use crate::error::{io_err, DaemonError};
use crate::publish::{commit_message, PublishOutcome};

/// Marker the extractor prints when it appended an entry.
pub const NEW_LOCATION_MARKER: &str = "New location recorded";
/// Marker the extractor prints when the position did not move.
pub const UNCHANGED_MARKER: &str = "Location unchanged";

const RELAYED_PREFIXES: [&str; 4] = ["Lat:", "Lon:", "Location:", "Last seen:"];
const TAIL_LINES: usize = 5;
const STDERR_LOG_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    NewLocation,
    Unchanged,
    /// Neither marker was seen, or the extractor could not be run.
    Indeterminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub new_locations: u64,
    pub unchanged: u64,
    pub indeterminate: u64,
    pub consecutive_indeterminate: u64,
    pub published: u64,
}

/// Classify subordinate stdout by marker substring.
pub fn classify_output(stdout: &str) -> CycleOutcome {
    if stdout.contains(NEW_LOCATION_MARKER) {
        CycleOutcome::NewLocation
    } else if stdout.contains(UNCHANGED_MARKER) {
        CycleOutcome::Unchanged
    } else {
        CycleOutcome::Indeterminate
    }
}

/// The current-location lines of a new-location run, in order.
pub fn location_lines(stdout: &str) -> Vec<&str> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| RELAYED_PREFIXES.iter().any(|p| line.starts_with(p)))
        .collect()
}

/// Last `TAIL_LINES` non-empty lines, oldest first.
pub fn tail_lines(stdout: &str) -> Vec<&str> {
    let lines: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(TAIL_LINES);
    lines[start..].to_vec()
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

/// Drives refresh → settle → hide → extract → classify → publish.
pub struct PollLoop<A> {
    config: TrackerConfig,
    actions: A,
    state: LoopState,
    stats: LoopStats,
}

impl<A: CycleActions> PollLoop<A> {
    pub fn new(config: TrackerConfig, actions: A) -> Self {
        Self {
            config,
            actions,
            state: LoopState::Idle,
            stats: LoopStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    /// One full cycle. External failures are logged, never returned.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.state = LoopState::Running;
        self.stats.cycles += 1;
        tracing::info!(
            cycle = self.stats.cycles,
            name = %self.config.tracked_name,
            "checking location",
        );

        if let Err(err) = self.actions.refresh_cache().await {
            tracing::warn!(error = %err, "refresh failed, listing cache directory instead");
            if let Err(err) = self.actions.nudge_cache_dir().await {
                tracing::debug!(error = %err, "cache directory listing failed");
            }
        }

        tokio::time::sleep(self.config.poll.settle()).await;

        if let Err(err) = self.actions.hide_app().await {
            tracing::debug!(error = %err, "hide failed");
        }

        let outcome = match self.actions.run_extractor().await {
            Ok(output) => self.report_output(&output),
            Err(err) => {
                tracing::warn!(error = %err, "extractor did not complete");
                CycleOutcome::Indeterminate
            }
        };

        if outcome == CycleOutcome::NewLocation {
            self.publish().await;
        }

        self.record(outcome);
        self.state = LoopState::Idle;
        outcome
    }

    /// First cycle immediately, then one every interval until `shutdown`
    /// resolves. Shutdown also cancels an in-flight cycle; steps that already
    /// completed are not rolled back.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), DaemonError>
    where
        F: Future<Output = Result<(), DaemonError>>,
    {
        tokio::pin!(shutdown);
        let interval = self.config.poll.interval();
        tracing::info!(interval_secs = interval.as_secs(), "poll loop started");

        loop {
            let stopped = tokio::select! {
                biased;
                result = &mut shutdown => Some(result),
                _ = self.run_cycle() => None,
            };
            if let Some(result) = stopped {
                return self.stop(result);
            }

            tokio::select! {
                biased;
                result = &mut shutdown => return self.stop(result),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    fn stop(&mut self, result: Result<(), DaemonError>) -> Result<(), DaemonError> {
        if self.state == LoopState::Running {
            tracing::info!(cycle = self.stats.cycles, "cycle interrupted");
            self.state = LoopState::Idle;
        }
        tracing::info!(cycles = self.stats.cycles, "poll loop stopped");
        result
    }

    fn report_output(&self, output: &ExtractorOutput) -> CycleOutcome {
        let stderr = output.stderr.trim();
        if !stderr.is_empty() {
            let head: String = stderr.chars().take(STDERR_LOG_CHARS).collect();
            tracing::warn!(stderr = %head, "extractor wrote to stderr");
        }

        let outcome = classify_output(&output.stdout);
        match outcome {
            CycleOutcome::NewLocation => {
                tracing::info!("new location recorded");
                for line in location_lines(&output.stdout) {
                    tracing::info!("  {line}");
                }
            }
            CycleOutcome::Unchanged => tracing::info!("location unchanged"),
            CycleOutcome::Indeterminate => {
                tracing::warn!(
                    consecutive = self.stats.consecutive_indeterminate + 1,
                    "could not determine location status",
                );
                for line in tail_lines(&output.stdout) {
                    tracing::info!("  {line}");
                }
            }
        }
        outcome
    }

    async fn publish(&mut self) {
        let message = commit_message(&self.config.tracked_name, Local::now());
        match self.actions.publish(&message).await {
            Ok(PublishOutcome::Published) => self.stats.published += 1,
            Ok(PublishOutcome::NothingToCommit) | Ok(PublishOutcome::Skipped) => {}
            Err(err) => tracing::warn!(error = %err, "publish failed"),
        }
    }

    fn record(&mut self, outcome: CycleOutcome) {
        match outcome {
            CycleOutcome::NewLocation => {
                self.stats.new_locations += 1;
                self.stats.consecutive_indeterminate = 0;
            }
            CycleOutcome::Unchanged => {
                self.stats.unchanged += 1;
                self.stats.consecutive_indeterminate = 0;
            }
            CycleOutcome::Indeterminate => {
                self.stats.indeterminate += 1;
                self.stats.consecutive_indeterminate += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DaemonOptions {
    /// The `tagtrail` binary run for each extraction.
    pub extractor: PathBuf,
    /// Run a single cycle and exit.
    pub once: bool,
    pub json_logs: bool,
}

/// Start the poll loop and block the current thread until it exits.
pub fn start_blocking(config: TrackerConfig, options: DaemonOptions) -> Result<(), DaemonError> {
    init_tracing("info", options.json_logs);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config, options))
}

/// Run the poll loop with the real system actions.
///
/// A corrupt history file aborts here, before the first cycle.
pub async fn run(config: TrackerConfig, options: DaemonOptions) -> Result<(), DaemonError> {
    let store = HistoryStore::new(&config.history_path, config.tracked_name.clone());
    let existing = store.load()?;
    tracing::info!(
        name = %config.tracked_name,
        history = %store.path().display(),
        entries = existing.len(),
        publish = config.publish.enabled,
        "tagtrail daemon starting",
    );

    let actions = SystemActions::new(&config, options.extractor);
    let mut poll = PollLoop::new(config, actions);

    if options.once {
        poll.run_cycle().await;
        return Ok(());
    }
    poll.run_until(ctrl_c()).await
}

async fn ctrl_c() -> Result<(), DaemonError> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|err| DaemonError::Signal(err.to_string()))?;
    tracing::info!("received ctrl-c, shutting down");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` overrides `default_filter`.
/// Logs go to stderr so command output on stdout stays parseable.
pub fn init_tracing(default_filter: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
