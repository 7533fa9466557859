//! Dry-run executor: logs jobs instead of running them.

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::info;

use kashti_core::Result;
use kashti_core::executor::Executor;
use kashti_core::job::{JobOutcome, JobSpec};

/// An executor that runs nothing. Every job is logged and reported as
/// successful, with the rendered shell command as its log text.
///
/// Used by the CLI's `run` command and as a simulation backend in
/// tests; `failing` marks job names that should report failure instead.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    fail: HashSet<String>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate failure for the named jobs.
    pub fn failing<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fail: names.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Executor for DryRunExecutor {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn execute(&self, spec: JobSpec) -> Result<JobOutcome> {
        let command = spec.shell_command();
        info!(job = %spec.name, image = %spec.image, command = %command, "dry-run job");

        if self.fail.contains(&spec.name) {
            return Ok(JobOutcome::failure(
                1,
                format!("dry-run: simulated failure of {}", spec.name),
            ));
        }
        Ok(JobOutcome::success(format!(
            "dry-run: {} would run `{}` in {}",
            spec.name, command, spec.image
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_success_without_running() {
        let executor = DryRunExecutor::new();
        let spec = JobSpec::new("kashti-test", "node:8").task("ng test --single-run");

        let outcome = executor.execute(spec).await.unwrap();
        assert!(outcome.is_success());
        assert!(outcome.log.contains("ng test --single-run"));
        assert!(outcome.log.contains("node:8"));
    }

    #[tokio::test]
    async fn test_simulated_failure() {
        let executor = DryRunExecutor::failing(["kashti-release"]);

        let ok = executor
            .execute(JobSpec::new("kashti-test", "node:8"))
            .await
            .unwrap();
        assert!(ok.is_success());

        let failed = executor
            .execute(JobSpec::new("kashti-release", "alpine"))
            .await
            .unwrap();
        assert!(!failed.is_success());
        assert_eq!(failed.exit_code, 1);
    }
}
