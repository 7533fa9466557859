//! Event routing: deciding what a run looks like.

use tracing::info;

use kashti_config::ProjectConfig;
use kashti_core::Result;
use kashti_core::event::{CheckPayload, Event, EventKind, PushPayload};
use kashti_core::notify::{CommitState, check_env};
use kashti_core::pipeline::{ExecutionMode, NotifyPlan, Pipeline};

use crate::jobs;

/// Maps inbound events to pipelines.
///
/// `route` is a pure function of event + config: no I/O, no clock, no
/// randomness. The same event always produces a structurally identical
/// pipeline.
#[derive(Debug, Clone)]
pub struct EventRouter {
    config: ProjectConfig,
}

impl EventRouter {
    pub fn new(config: ProjectConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Build the pipeline for an event.
    ///
    /// Unknown event kinds and pushes to non-release refs produce the
    /// empty pipeline; only a malformed payload is an error.
    pub fn route(&self, event: &Event) -> Result<Pipeline> {
        match &event.kind {
            EventKind::Push => self.route_push(event),
            EventKind::CheckSuiteRequested
            | EventKind::CheckSuiteRerequested
            | EventKind::CheckRunRerequested => self.route_check_request(event),
            EventKind::Exec => self.route_exec(),
            EventKind::Unknown(name) => {
                info!(event = %name, "unhandled event kind; skipping");
                Ok(Pipeline::empty())
            }
        }
    }

    /// Push: release builds for tags and the default branch, nothing
    /// otherwise.
    fn route_push(&self, event: &Event) -> Result<Pipeline> {
        let config = &self.config;
        let payload = PushPayload::from_payload(&event.payload)?;

        if payload.tag().is_none() && payload.r#ref != config.default_branch_ref() {
            info!(r#ref = %payload.r#ref, "not a tag or a push to the default branch; skipping");
            return Ok(Pipeline::empty());
        }

        let tag = payload.ref_name();
        let pending = jobs::commit_status_job(
            config,
            event,
            CommitState::Pending,
            format!("build started as {}", event.build_id),
        );
        let releaser =
            jobs::registry_build_job(config, format!("{}-release", config.name), tag);
        let latest_releaser = jobs::registry_build_job(
            config,
            format!("{}-release-latest", config.name),
            "latest",
        );

        Pipeline::builder()
            .stage("notify", vec![pending])
            .stage("release", vec![releaser, latest_releaser])
            .mode(ExecutionMode::RunAllIndependent)
            .notify(NotifyPlan {
                success: jobs::commit_status_job(
                    config,
                    event,
                    CommitState::Success,
                    format!("build {} passed", event.build_id),
                ),
                failure: jobs::commit_status_job(
                    config,
                    event,
                    CommitState::Failure,
                    format!("failed build {}", event.build_id),
                ),
                summary_key: None,
            })
            .build()
    }

    /// Check request: start notification, then tests plus a throwaway
    /// build tagged with the short head SHA, then an end notification
    /// carrying the conclusion.
    fn route_check_request(&self, event: &Event) -> Result<Pipeline> {
        let config = &self.config;
        let payload = CheckPayload::from_payload(&event.payload)?;
        let tag = format!("git-{}", payload.short_sha());

        let start = jobs::check_run_job(config, event, "start-run")
            .env(check_env::SUMMARY, "Beginning test run");
        let tester = jobs::test_job(config);
        let releaser =
            jobs::registry_build_job(config, format!("{}-test-release", config.name), &tag);

        let end_success = jobs::check_run_job(config, event, "end-run")
            .env(check_env::CONCLUSION, "success")
            .env(check_env::SUMMARY, "Build completed");
        let end_failure = jobs::check_run_job(config, event, "end-run")
            .env(check_env::CONCLUSION, "failed")
            .env(check_env::SUMMARY, "Build failed");

        Pipeline::builder()
            .stage("start-run", vec![start])
            .stage("test", vec![tester, releaser])
            .mode(ExecutionMode::ShortCircuit)
            .notify(NotifyPlan {
                success: end_success,
                failure: end_failure,
                summary_key: Some(check_env::TEXT.to_string()),
            })
            .build()
    }

    /// Manual trigger: tests and e2e together, fire-and-forget. This
    /// path reports no status.
    fn route_exec(&self) -> Result<Pipeline> {
        let config = &self.config;

        Pipeline::builder()
            .stage(
                "test",
                vec![jobs::test_job(config), jobs::e2e_job(config)],
            )
            .build()
    }
}
