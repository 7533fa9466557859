//! CLI command implementations.

mod envelope;

use anyhow::{Context, Result};
use std::io::Read;
use std::sync::Arc;
use tracing::{info, warn};

use kashti_config::{ProjectConfig, Secrets};
use kashti_core::event::Event;
use kashti_core::pipeline::StageStatus;
use kashti_executor::DryRunExecutor;
use kashti_router::EventRouter;
use kashti_runner::{PipelineEvent, PipelineRunner};

use envelope::EventEnvelope;

/// Route an event and print the resulting pipeline as JSON.
pub fn route(config_path: &str, event_path: &str) -> Result<()> {
    let router = EventRouter::new(load_config(config_path)?);
    let event = load_event(event_path)?;

    let pipeline = router
        .route(&event)
        .with_context(|| format!("failed to route {} event", event.kind))?;

    if pipeline.is_empty() {
        println!("Empty pipeline: nothing to run for this event");
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&pipeline)?);
    Ok(())
}

/// Route an event and execute the pipeline with the dry-run executor.
pub async fn run(config_path: &str, event_path: &str, fail: Vec<String>) -> Result<()> {
    let router = EventRouter::new(load_config(config_path)?);
    let event = load_event(event_path)?;

    let pipeline = router
        .route(&event)
        .with_context(|| format!("failed to route {} event", event.kind))?;

    info!(
        event = %event.kind,
        stages = pipeline.stages.len(),
        jobs = pipeline.job_count(),
        "routed event"
    );
    println!(
        "Routed {} event to {} stage(s), {} job(s)",
        event.kind,
        pipeline.stages.len(),
        pipeline.job_count()
    );

    let executor = Arc::new(DryRunExecutor::failing(fail));
    let runner = PipelineRunner::new(executor);

    let (mut rx, result_handle) = runner.execute(pipeline);

    while let Some(progress) = rx.recv().await {
        match progress {
            PipelineEvent::StageStarted { stage } => {
                println!("▶ Stage '{}' started", stage);
            }
            PipelineEvent::JobCompleted {
                stage,
                job,
                success,
            } => {
                let marker = if success { "✓" } else { "✗" };
                println!("  [{}] {} {}", stage, marker, job);
            }
            PipelineEvent::StageCompleted { stage, success } => {
                if success {
                    println!("✓ Stage '{}' completed successfully", stage);
                } else {
                    println!("✗ Stage '{}' failed", stage);
                }
            }
            PipelineEvent::NotificationSent {
                job,
                state,
                delivered,
            } => {
                println!(
                    "  notification '{}' reported state={} (delivered: {})",
                    job, state, delivered
                );
            }
            PipelineEvent::PipelineCompleted { success } => {
                if success {
                    println!("--- Pipeline completed successfully ---");
                } else {
                    println!("--- Pipeline failed ---");
                }
            }
        }
    }

    let result = result_handle
        .await
        .context("pipeline execution task failed")?;

    println!("\n--- Stage Summary (run {}) ---", result.id);
    for stage in &result.stages {
        let status = match &stage.status {
            StageStatus::Succeeded => "✓ succeeded".to_string(),
            StageStatus::Failed { message } => format!("✗ failed: {}", message),
            StageStatus::Skipped { reason } => format!("⊘ skipped: {}", reason),
        };
        println!("  {} - {}", stage.name, status);
    }

    if result.succeeded {
        Ok(())
    } else {
        anyhow::bail!("pipeline failed");
    }
}

/// Validate a project configuration file.
pub fn validate(path: &str) -> Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;

    match ProjectConfig::parse(&content) {
        Ok(config) => {
            println!("Configuration is valid");
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(path: &str) -> Result<ProjectConfig> {
    let config = if std::path::Path::new(path).exists() {
        let config =
            ProjectConfig::from_file(path).with_context(|| format!("failed to parse {}", path))?;
        info!(path = %path, project = %config.name, "loaded project configuration");
        config
    } else {
        warn!(path = %path, "config file not found; using defaults");
        ProjectConfig::default_for("kashti")
    };
    Ok(config.with_secrets(Secrets::from_env()))
}

fn load_event(path: &str) -> Result<Event> {
    let content = if path == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read event from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?
    };

    let envelope: EventEnvelope =
        serde_json::from_str(&content).context("event envelope is not valid JSON")?;
    Ok(envelope.into_event())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kashti_core::event::{EventKind, Revision};
    use kashti_core::notify::CommitState;

    fn tag_push_event() -> Event {
        Event {
            kind: EventKind::Push,
            build_id: "b-7".to_string(),
            payload: r#"{"ref": "refs/tags/v1.2.0"}"#.to_string(),
            revision: Revision {
                commit: "abc123".to_string(),
                r#ref: "refs/tags/v1.2.0".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_tag_push_end_to_end() {
        let router = EventRouter::new(ProjectConfig::default_for("kashti"));
        let pipeline = router.route(&tag_push_event()).unwrap();

        let runner = PipelineRunner::new(Arc::new(DryRunExecutor::new()));
        let result = runner.run(pipeline).await;

        assert!(result.succeeded);
        let notification = result.notification.unwrap();
        assert_eq!(notification.job, "notify-success");
        assert_eq!(notification.state, CommitState::Success);
        assert!(notification.delivered);
    }

    #[tokio::test]
    async fn test_failed_release_notifies_failure_end_to_end() {
        let router = EventRouter::new(ProjectConfig::default_for("kashti"));
        let pipeline = router.route(&tag_push_event()).unwrap();

        let runner =
            PipelineRunner::new(Arc::new(DryRunExecutor::failing(["kashti-release"])));
        let result = runner.run(pipeline).await;

        assert!(!result.succeeded);
        let notification = result.notification.unwrap();
        assert_eq!(notification.job, "notify-failure");
        assert_eq!(notification.state, CommitState::Failure);
    }
}
