//! Interpretation pipeline: prompts, scoring, worker pool, orchestrator

pub mod fortune;
pub mod orchestrator;
pub mod prompt;
pub mod workers;

use thiserror::Error;

pub use orchestrator::{PipelineService, RunTicket};
pub use workers::{Admission, WorkerPool};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A run for this session is already in flight
    #[error("A reading is already being processed for this session")]
    AlreadyRunning,

    /// The session is not in a state the pipeline can start from
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error(transparent)]
    Store(#[from] taro_common::Error),
}
