//! Pipeline runner - executes stages against the external executor.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use kashti_core::RunId;
use kashti_core::error::StageFailure;
use kashti_core::executor::Executor;
use kashti_core::job::JobSpec;
use kashti_core::notify::CommitState;
use kashti_core::pipeline::{
    ExecutionMode, JobReport, NotificationReport, NotifyPlan, Pipeline, RunResult, Stage,
    StageResult, StageStatus,
};

/// Event emitted during pipeline execution.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StageStarted {
        stage: String,
    },
    JobCompleted {
        stage: String,
        job: String,
        success: bool,
    },
    StageCompleted {
        stage: String,
        success: bool,
    },
    NotificationSent {
        job: String,
        state: CommitState,
        delivered: bool,
    },
    PipelineCompleted {
        success: bool,
    },
}

/// Executes pipelines: stages sequentially, member jobs concurrently,
/// exactly one terminal notification per run.
pub struct PipelineRunner {
    executor: Arc<dyn Executor>,
}

impl PipelineRunner {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    /// Execute a pipeline, returning a channel of events and a handle to
    /// await the final result.
    pub fn execute(
        &self,
        pipeline: Pipeline,
    ) -> (
        mpsc::Receiver<PipelineEvent>,
        tokio::task::JoinHandle<RunResult>,
    ) {
        let (tx, rx) = mpsc::channel(100);
        let executor = self.executor.clone();

        let handle = tokio::spawn(async move { Self::execute_inner(executor, pipeline, tx).await });

        (rx, handle)
    }

    /// Execute a pipeline to completion, discarding progress events.
    pub async fn run(&self, pipeline: Pipeline) -> RunResult {
        // Receiver dropped up front; event sends fail fast and are ignored.
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        Self::execute_inner(self.executor.clone(), pipeline, tx).await
    }

    async fn execute_inner(
        executor: Arc<dyn Executor>,
        pipeline: Pipeline,
        tx: mpsc::Sender<PipelineEvent>,
    ) -> RunResult {
        let id = RunId::new();
        let started_at = Utc::now();

        if pipeline.is_empty() {
            info!(run = %id, "empty pipeline; nothing to run");
            let _ = tx.send(PipelineEvent::PipelineCompleted { success: true }).await;
            return RunResult {
                id,
                succeeded: true,
                stages: Vec::new(),
                failure: None,
                notification: None,
                started_at,
                finished_at: Utc::now(),
            };
        }

        let (stages, failure) = match pipeline.mode {
            ExecutionMode::ShortCircuit => {
                Self::run_short_circuit(&executor, &pipeline.stages, &tx).await
            }
            ExecutionMode::RunAllIndependent => {
                Self::run_all_independent(&executor, &pipeline.stages, &tx).await
            }
        };

        let succeeded = failure.is_none();

        // One terminal notification per run, success or failure, never
        // retried.
        let notification = match pipeline.notify {
            Some(plan) => {
                Some(Self::send_notification(&executor, plan, failure.as_ref(), &tx).await)
            }
            None => None,
        };

        if let Some(ref f) = failure {
            error!(run = %id, stage = %f.stage, jobs = ?f.failed_jobs, "pipeline failed");
        } else {
            info!(run = %id, "pipeline succeeded");
        }
        let _ = tx
            .send(PipelineEvent::PipelineCompleted { success: succeeded })
            .await;

        RunResult {
            id,
            succeeded,
            stages,
            failure,
            notification,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Stages in declared order; the first failure skips the rest.
    /// In-flight siblings of a failing job are awaited, never cancelled.
    async fn run_short_circuit(
        executor: &Arc<dyn Executor>,
        stages: &[Stage],
        tx: &mpsc::Sender<PipelineEvent>,
    ) -> (Vec<StageResult>, Option<StageFailure>) {
        let mut results = Vec::with_capacity(stages.len());
        let mut failure: Option<StageFailure> = None;

        for (index, stage) in stages.iter().enumerate() {
            if let Some(ref f) = failure {
                info!(stage = %stage.name, failed = %f.stage, "skipping stage after failure");
                results.push(StageResult {
                    name: stage.name.clone(),
                    status: StageStatus::Skipped {
                        reason: format!("stage '{}' failed", f.stage),
                    },
                    jobs: Vec::new(),
                    started_at: None,
                    finished_at: None,
                });
                continue;
            }

            let (result, stage_failure) = Self::run_stage(executor, index, stage, tx).await;
            results.push(result);
            failure = stage_failure;
        }

        (results, failure)
    }

    /// All stages' jobs dispatched in one batch with no inter-stage
    /// ordering; failures aggregated into one report.
    async fn run_all_independent(
        executor: &Arc<dyn Executor>,
        stages: &[Stage],
        tx: &mpsc::Sender<PipelineEvent>,
    ) -> (Vec<StageResult>, Option<StageFailure>) {
        let started_at = Utc::now();
        for stage in stages {
            let _ = tx
                .send(PipelineEvent::StageStarted {
                    stage: stage.name.clone(),
                })
                .await;
        }

        let all_jobs: Vec<JobSpec> = stages.iter().flat_map(|s| s.jobs.clone()).collect();
        let outcomes = executor.execute_batch(all_jobs).await;

        // Reassemble per-stage results from the flattened batch.
        let mut results = Vec::with_capacity(stages.len());
        let mut failure: Option<StageFailure> = None;
        let mut cursor = 0;
        for (index, stage) in stages.iter().enumerate() {
            let slice = &outcomes[cursor..cursor + stage.jobs.len()];
            cursor += stage.jobs.len();

            let reports: Vec<JobReport> = slice
                .iter()
                .map(|(name, outcome)| Self::job_report(name, outcome))
                .collect();
            for report in &reports {
                let _ = tx
                    .send(PipelineEvent::JobCompleted {
                        stage: stage.name.clone(),
                        job: report.name.clone(),
                        success: report.success,
                    })
                    .await;
            }

            let stage_failure = Self::stage_failure(index, stage, &reports);
            let status = match &stage_failure {
                None => StageStatus::Succeeded,
                Some(f) => StageStatus::Failed {
                    message: f.to_string(),
                },
            };
            let _ = tx
                .send(PipelineEvent::StageCompleted {
                    stage: stage.name.clone(),
                    success: stage_failure.is_none(),
                })
                .await;

            // Keep the lowest failing stage index, fold in the rest.
            if let Some(next) = stage_failure {
                if let Some(first) = failure.as_mut() {
                    first.failed_jobs.extend(next.failed_jobs);
                    first.errors.extend(next.errors);
                } else {
                    failure = Some(next);
                }
            }

            results.push(StageResult {
                name: stage.name.clone(),
                status,
                jobs: reports,
                started_at: Some(started_at),
                finished_at: Some(Utc::now()),
            });
        }

        (results, failure)
    }

    /// Dispatch one stage's jobs concurrently and await them all.
    async fn run_stage(
        executor: &Arc<dyn Executor>,
        index: usize,
        stage: &Stage,
        tx: &mpsc::Sender<PipelineEvent>,
    ) -> (StageResult, Option<StageFailure>) {
        info!(stage = %stage.name, jobs = stage.jobs.len(), "starting stage");
        let _ = tx
            .send(PipelineEvent::StageStarted {
                stage: stage.name.clone(),
            })
            .await;
        let started_at = Utc::now();

        let outcomes = executor.execute_batch(stage.jobs.clone()).await;
        let reports: Vec<JobReport> = outcomes
            .iter()
            .map(|(name, outcome)| Self::job_report(name, outcome))
            .collect();
        for report in &reports {
            let _ = tx
                .send(PipelineEvent::JobCompleted {
                    stage: stage.name.clone(),
                    job: report.name.clone(),
                    success: report.success,
                })
                .await;
        }

        let failure = Self::stage_failure(index, stage, &reports);
        let status = match &failure {
            None => StageStatus::Succeeded,
            Some(f) => StageStatus::Failed {
                message: f.to_string(),
            },
        };
        let _ = tx
            .send(PipelineEvent::StageCompleted {
                stage: stage.name.clone(),
                success: failure.is_none(),
            })
            .await;

        (
            StageResult {
                name: stage.name.clone(),
                status,
                jobs: reports,
                started_at: Some(started_at),
                finished_at: Some(Utc::now()),
            },
            failure,
        )
    }

    fn job_report(
        name: &str,
        outcome: &kashti_core::Result<kashti_core::job::JobOutcome>,
    ) -> JobReport {
        match outcome {
            Ok(o) if o.is_success() => JobReport {
                name: name.to_string(),
                success: true,
                exit_code: Some(o.exit_code),
                error: None,
            },
            Ok(o) => JobReport {
                name: name.to_string(),
                success: false,
                exit_code: Some(o.exit_code),
                error: Some(format!("exit code {}", o.exit_code)),
            },
            // Executor transport errors count as job failures.
            Err(e) => JobReport {
                name: name.to_string(),
                success: false,
                exit_code: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn stage_failure(index: usize, stage: &Stage, reports: &[JobReport]) -> Option<StageFailure> {
        let failed: Vec<&JobReport> = reports.iter().filter(|r| !r.success).collect();
        if failed.is_empty() {
            return None;
        }

        Some(StageFailure {
            stage_index: index,
            stage: stage.name.clone(),
            failed_jobs: failed.iter().map(|r| r.name.clone()).collect(),
            errors: failed
                .iter()
                .map(|r| r.error.clone().unwrap_or_default())
                .collect(),
        })
    }

    /// Dispatch exactly one of the plan's terminal jobs. A notification
    /// job that itself fails is logged and recorded, never retried.
    async fn send_notification(
        executor: &Arc<dyn Executor>,
        plan: NotifyPlan,
        failure: Option<&StageFailure>,
        tx: &mpsc::Sender<PipelineEvent>,
    ) -> NotificationReport {
        let (mut job, state) = match failure {
            None => (plan.success, CommitState::Success),
            Some(_) => (plan.failure, CommitState::Failure),
        };

        if let Some(key) = plan.summary_key {
            let summary = match failure {
                None => "all stages succeeded".to_string(),
                Some(f) => f.to_string(),
            };
            job = job.env(key, summary);
        }

        let name = job.name.clone();
        let delivered = match executor.execute(job).await {
            Ok(outcome) if outcome.is_success() => true,
            Ok(outcome) => {
                warn!(job = %name, exit_code = outcome.exit_code, "notification job failed");
                false
            }
            Err(e) => {
                warn!(job = %name, error = %e, "notification dispatch failed");
                false
            }
        };

        let _ = tx
            .send(PipelineEvent::NotificationSent {
                job: name.clone(),
                state,
                delivered,
            })
            .await;

        NotificationReport {
            job: name,
            state,
            delivered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kashti_core::job::JobOutcome;
    use kashti_core::pipeline::Pipeline;
    use kashti_core::{Error, Result};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records every executed spec; jobs named in `fail` exit non-zero,
    /// jobs named in `unreachable` produce executor errors.
    struct MockExecutor {
        executed: Mutex<Vec<JobSpec>>,
        fail: HashSet<String>,
        unreachable: HashSet<String>,
    }

    impl MockExecutor {
        fn new() -> Self {
            Self {
                executed: Mutex::new(Vec::new()),
                fail: HashSet::new(),
                unreachable: HashSet::new(),
            }
        }

        fn failing(names: &[&str]) -> Self {
            let mut executor = Self::new();
            executor.fail = names.iter().map(|n| n.to_string()).collect();
            executor
        }

        fn unreachable_for(names: &[&str]) -> Self {
            let mut executor = Self::new();
            executor.unreachable = names.iter().map(|n| n.to_string()).collect();
            executor
        }

        fn executed_names(&self) -> Vec<String> {
            self.executed
                .lock()
                .unwrap()
                .iter()
                .map(|s| s.name.clone())
                .collect()
        }

        fn executed_specs(&self) -> Vec<JobSpec> {
            self.executed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Executor for MockExecutor {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn execute(&self, spec: JobSpec) -> Result<JobOutcome> {
            let name = spec.name.clone();
            self.executed.lock().unwrap().push(spec);

            if self.unreachable.contains(&name) {
                return Err(Error::Executor("connection refused".to_string()));
            }
            if self.fail.contains(&name) {
                return Ok(JobOutcome::failure(1, format!("{} blew up", name)));
            }
            Ok(JobOutcome::success(format!("{} ok", name)))
        }
    }

    fn job(name: &str) -> JobSpec {
        JobSpec::new(name, "alpine").task("echo hi")
    }

    fn notify_plan(summary_key: Option<&str>) -> NotifyPlan {
        NotifyPlan {
            success: job("notify-success"),
            failure: job("notify-failure"),
            summary_key: summary_key.map(|k| k.to_string()),
        }
    }

    fn two_stage_pipeline(mode: ExecutionMode) -> Pipeline {
        Pipeline::builder()
            .stage("first", vec![job("a"), job("b")])
            .stage("second", vec![job("c")])
            .mode(mode)
            .notify(notify_plan(None))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_pipeline_dispatches_nothing() {
        let executor = Arc::new(MockExecutor::new());
        let runner = PipelineRunner::new(executor.clone());

        let result = runner.run(Pipeline::empty()).await;

        assert!(result.succeeded);
        assert!(result.stages.is_empty());
        assert!(result.notification.is_none());
        assert!(executor.executed_names().is_empty());
    }

    #[tokio::test]
    async fn test_successful_run_notifies_success_once() {
        let executor = Arc::new(MockExecutor::new());
        let runner = PipelineRunner::new(executor.clone());

        let result = runner.run(two_stage_pipeline(ExecutionMode::ShortCircuit)).await;

        assert!(result.succeeded);
        assert!(result.stages.iter().all(|s| s.status.is_success()));

        let notification = result.notification.unwrap();
        assert_eq!(notification.job, "notify-success");
        assert_eq!(notification.state, CommitState::Success);
        assert!(notification.delivered);

        let names = executor.executed_names();
        let notify_count = names.iter().filter(|n| n.starts_with("notify-")).count();
        assert_eq!(notify_count, 1);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_remaining_stages() {
        let executor = Arc::new(MockExecutor::failing(&["a"]));
        let runner = PipelineRunner::new(executor.clone());

        let result = runner.run(two_stage_pipeline(ExecutionMode::ShortCircuit)).await;

        assert!(!result.succeeded);
        assert!(matches!(
            result.stages[0].status,
            StageStatus::Failed { .. }
        ));
        assert!(matches!(
            result.stages[1].status,
            StageStatus::Skipped { .. }
        ));

        // "c" never dispatched; the failing stage's sibling "b" still ran.
        let names = executor.executed_names();
        assert!(names.contains(&"b".to_string()));
        assert!(!names.contains(&"c".to_string()));

        let failure = result.failure.unwrap();
        assert_eq!(failure.stage_index, 0);
        assert_eq!(failure.failed_jobs, vec!["a"]);

        let notification = result.notification.unwrap();
        assert_eq!(notification.job, "notify-failure");
        assert_eq!(notification.state, CommitState::Failure);
    }

    #[tokio::test]
    async fn test_run_all_independent_dispatches_every_stage() {
        let executor = Arc::new(MockExecutor::failing(&["a", "c"]));
        let runner = PipelineRunner::new(executor.clone());

        let result = runner
            .run(two_stage_pipeline(ExecutionMode::RunAllIndependent))
            .await;

        assert!(!result.succeeded);
        // No short-circuit: every job ran despite the failures.
        let names = executor.executed_names();
        for expected in ["a", "b", "c"] {
            assert!(names.contains(&expected.to_string()));
        }

        // Failures from both stages aggregated, lowest stage index kept.
        let failure = result.failure.unwrap();
        assert_eq!(failure.stage_index, 0);
        assert_eq!(failure.failed_jobs, vec!["a", "c"]);

        // Still exactly one notification.
        let notify_count = names.iter().filter(|n| n.starts_with("notify-")).count();
        assert_eq!(notify_count, 1);
    }

    #[tokio::test]
    async fn test_executor_error_is_a_job_failure() {
        let executor = Arc::new(MockExecutor::unreachable_for(&["c"]));
        let runner = PipelineRunner::new(executor.clone());

        let result = runner.run(two_stage_pipeline(ExecutionMode::ShortCircuit)).await;

        assert!(!result.succeeded);
        let failure = result.failure.unwrap();
        assert_eq!(failure.stage, "second");
        assert_eq!(failure.failed_jobs, vec!["c"]);
        assert!(failure.errors[0].contains("executor error"));

        let notification = result.notification.unwrap();
        assert_eq!(notification.job, "notify-failure");
    }

    #[tokio::test]
    async fn test_failure_summary_injected_under_key() {
        let executor = Arc::new(MockExecutor::failing(&["a"]));
        let runner = PipelineRunner::new(executor.clone());

        let pipeline = Pipeline::builder()
            .stage("first", vec![job("a")])
            .notify(notify_plan(Some("CHECK_TEXT")))
            .build()
            .unwrap();

        let result = runner.run(pipeline).await;
        assert!(!result.succeeded);

        let specs = executor.executed_specs();
        let notify_spec = specs.iter().find(|s| s.name == "notify-failure").unwrap();
        let text = notify_spec.env.get("CHECK_TEXT").unwrap();
        assert!(text.contains("a blew up") || text.contains("first"));
    }

    #[tokio::test]
    async fn test_failed_notification_recorded_not_retried() {
        let executor = Arc::new(MockExecutor::failing(&["notify-success"]));
        let runner = PipelineRunner::new(executor.clone());

        let pipeline = Pipeline::builder()
            .stage("first", vec![job("a")])
            .notify(notify_plan(None))
            .build()
            .unwrap();

        let result = runner.run(pipeline).await;

        // The stages succeeded; only the notification job failed.
        assert!(result.succeeded);
        let notification = result.notification.unwrap();
        assert!(!notification.delivered);

        let names = executor.executed_names();
        let notify_count = names.iter().filter(|n| n.starts_with("notify-")).count();
        assert_eq!(notify_count, 1);
    }

    #[tokio::test]
    async fn test_execute_emits_events_in_order() {
        let executor = Arc::new(MockExecutor::new());
        let runner = PipelineRunner::new(executor);

        let (mut rx, handle) = runner.execute(two_stage_pipeline(ExecutionMode::ShortCircuit));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        let result = handle.await.unwrap();
        assert!(result.succeeded);

        assert!(matches!(events[0], PipelineEvent::StageStarted { .. }));
        assert!(matches!(
            events.last().unwrap(),
            PipelineEvent::PipelineCompleted { success: true }
        ));
        let notified = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::NotificationSent { .. }))
            .count();
        assert_eq!(notified, 1);
    }
}
