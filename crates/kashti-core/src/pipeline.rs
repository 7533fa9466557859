//! Pipeline, stage and run-result definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::StageFailure;
use crate::job::JobSpec;
use crate::notify::CommitState;
use crate::{Error, Result, RunId};

/// A set of jobs executed concurrently as one unit of pipeline progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage name.
    pub name: String,
    /// Jobs dispatched together when the stage starts.
    pub jobs: Vec<JobSpec>,
}

/// How stages relate to each other during execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Stages run in declared order; the first failed stage skips the rest.
    #[default]
    ShortCircuit,
    /// All stages' jobs are dispatched together with no inter-stage
    /// ordering; failures are collected and reported as one aggregate.
    RunAllIndependent,
}

/// The two pre-built terminal notification jobs for a run.
///
/// Exactly one of them is dispatched by the runner after all stages
/// resolve, carrying the final conclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyPlan {
    /// Dispatched when every stage succeeded.
    pub success: JobSpec,
    /// Dispatched otherwise.
    pub failure: JobSpec,
    /// Env key that receives the free-text run summary, when set.
    pub summary_key: Option<String>,
}

/// Ordered sequence of stages representing one full CI run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Stages in execution order.
    pub stages: Vec<Stage>,
    /// Inter-stage execution mode.
    pub mode: ExecutionMode,
    /// Terminal notification jobs, if this run reports status.
    pub notify: Option<NotifyPlan>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The empty pipeline: nothing to run, nothing to notify.
    pub fn empty() -> Self {
        Self {
            stages: Vec::new(),
            mode: ExecutionMode::default(),
            notify: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Total number of jobs across all stages.
    pub fn job_count(&self) -> usize {
        self.stages.iter().map(|s| s.jobs.len()).sum()
    }
}

/// Builder enforcing the job-name invariants at construction time.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
    mode: ExecutionMode,
    notify: Option<NotifyPlan>,
}

impl PipelineBuilder {
    /// Append a stage.
    pub fn stage(mut self, name: impl Into<String>, jobs: Vec<JobSpec>) -> Self {
        self.stages.push(Stage {
            name: name.into(),
            jobs,
        });
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn notify(mut self, plan: NotifyPlan) -> Self {
        self.notify = Some(plan);
        self
    }

    /// Build the pipeline, rejecting empty or duplicate job names.
    pub fn build(self) -> Result<Pipeline> {
        let mut seen = HashSet::new();
        for stage in &self.stages {
            for job in &stage.jobs {
                if job.name.is_empty() {
                    return Err(Error::InvalidJob(format!(
                        "unnamed job in stage '{}'",
                        stage.name
                    )));
                }
                if !seen.insert(job.name.as_str()) {
                    return Err(Error::InvalidJob(format!(
                        "duplicate job name '{}'",
                        job.name
                    )));
                }
            }
        }

        Ok(Pipeline {
            stages: self.stages,
            mode: self.mode,
            notify: self.notify,
        })
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Unique identifier for this run.
    pub id: RunId,
    /// Whether every stage succeeded.
    pub succeeded: bool,
    /// Per-stage results, in declaration order.
    pub stages: Vec<StageResult>,
    /// The first stage failure, when any stage failed.
    pub failure: Option<StageFailure>,
    /// The terminal notification dispatched for this run, if the
    /// pipeline carried a notify plan.
    pub notification: Option<NotificationReport>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

/// Result of a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub name: String,
    /// Final status.
    pub status: StageStatus,
    /// Per-job outcomes for dispatched stages; empty when skipped.
    pub jobs: Vec<JobReport>,
    /// When the stage's jobs were dispatched.
    pub started_at: Option<DateTime<Utc>>,
    /// When the last job in the stage resolved.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Final status of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Every member job succeeded.
    Succeeded,
    /// One or more member jobs failed.
    Failed { message: String },
    /// Never dispatched (earlier stage failed in short-circuit mode).
    Skipped { reason: String },
}

impl StageStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, StageStatus::Succeeded)
    }
}

/// Outcome of one job within a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    /// Job name.
    pub name: String,
    /// Whether the job succeeded.
    pub success: bool,
    /// Exit code when the executor ran the job to completion.
    pub exit_code: Option<i32>,
    /// Failure message (non-zero exit or executor error).
    pub error: Option<String>,
}

/// Record of the terminal notification dispatched for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationReport {
    /// Name of the notification job that was dispatched.
    pub job: String,
    /// The state it reported.
    pub state: CommitState,
    /// Whether the notification job itself succeeded.
    pub delivered: bool,
}
