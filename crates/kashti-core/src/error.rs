//! Error types for kashti CI orchestration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The inbound event payload could not be parsed or is missing a
    /// required field. Routing aborts; no pipeline is built and no
    /// notification is sent.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// One or more jobs in a stage failed.
    #[error(transparent)]
    Stage(#[from] StageFailure),

    /// The external executor itself was unreachable or errored. Treated
    /// by the runner exactly like a failed job.
    #[error("executor error: {0}")]
    Executor(String),

    /// A job specification violated a pipeline invariant (empty or
    /// duplicate name).
    #[error("invalid job: {0}")]
    InvalidJob(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Aggregated failure of a pipeline stage.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("stage {stage_index} ({stage}) failed: jobs [{}]: {}", .failed_jobs.join(", "), .errors.join("; "))]
pub struct StageFailure {
    /// Index of the failed stage in declaration order.
    pub stage_index: usize,
    /// Stage name.
    pub stage: String,
    /// Names of the jobs that failed within the stage.
    pub failed_jobs: Vec<String>,
    /// One message per failed job, in the same order as `failed_jobs`.
    pub errors: Vec<String>,
}
