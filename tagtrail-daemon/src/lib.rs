//! Poll loop daemon: refresh the cache, run the extractor, publish changes.

pub mod actions;
mod error;
pub mod publish;
mod runtime;

pub use actions::{CycleActions, ExtractorOutput, SystemActions};
pub use error::DaemonError;
pub use publish::{commit_message, publish_history, PublishOutcome};
pub use runtime::{
    classify_output, init_tracing, run, start_blocking, CycleOutcome, DaemonOptions, LoopState,
    LoopStats, PollLoop, NEW_LOCATION_MARKER, UNCHANGED_MARKER,
};
