//! Named job constructors.
//!
//! Each routed pipeline is assembled from these specs: one function per
//! job shape, fully populated from the project config and the event.

use kashti_config::ProjectConfig;
use kashti_core::event::Event;
use kashti_core::job::JobSpec;
use kashti_core::notify::{CommitState, check_env, status_env};

/// Check name reported to the checks service.
pub const CHECK_NAME: &str = "Kashti Tester";
/// Check title shown in the checks UI.
pub const CHECK_TITLE: &str = "Lint and test the UI";

/// Lint/unit-test job.
pub fn test_job(config: &ProjectConfig) -> JobSpec {
    JobSpec::new(format!("{}-test", config.name), &config.images.node).tasks([
        format!("cd {}", config.source_dir),
        "yarn install".to_string(),
        "ng lint".to_string(),
        "ng test --single-run".to_string(),
    ])
}

/// End-to-end test job.
pub fn e2e_job(config: &ProjectConfig) -> JobSpec {
    JobSpec::new(format!("{}-e2e", config.name), &config.images.node).tasks([
        format!("cd {}", config.source_dir),
        "yarn install".to_string(),
        "ng e2e".to_string(),
    ])
}

/// Release image build via the cloud registry CLI.
///
/// Logs in with a service principal, then builds and pushes
/// `<project>:<tag>` from the source directory. The registry secrets
/// ride along as env entries, opaque to this crate.
pub fn registry_build_job(config: &ProjectConfig, name: impl Into<String>, tag: &str) -> JobSpec {
    let image_name = format!("{}:{}", config.name, tag);

    JobSpec::new(name, &config.images.registry_cli)
        .env("AZURE_CONTAINER_REGISTRY", &config.secrets.registry)
        .env("ACR_TOKEN", &config.secrets.registry_token)
        .env("ACR_TENANT", &config.secrets.registry_tenant)
        .tasks([
            "az login --service-principal -u $AZURE_CONTAINER_REGISTRY -p $ACR_TOKEN --tenant $ACR_TENANT".to_string(),
            format!("cd {}", config.source_dir),
            format!("echo '========> building {}...'", config.name),
            format!("az acr build -r {} -t {} .", config.secrets.registry, image_name),
            format!("echo '<======== finished building {}.'", config.name),
        ])
}

/// Commit-status notification job.
pub fn commit_status_job(
    config: &ProjectConfig,
    event: &Event,
    state: CommitState,
    description: impl Into<String>,
) -> JobSpec {
    JobSpec::new(format!("notify-{}", state), &config.images.notify)
        .env(status_env::REPO, &config.repo)
        .env(status_env::STATE, state.to_string())
        .env(status_env::DESCRIPTION, description)
        .env(status_env::CONTEXT, &config.status_context)
        .env(status_env::TOKEN, &config.secrets.gh_token)
        .env(status_env::COMMIT, &event.revision.commit)
}

/// Check-run notification job. Conclusion and summary are layered on by
/// the caller via [`JobSpec::env`].
pub fn check_run_job(config: &ProjectConfig, event: &Event, name: impl Into<String>) -> JobSpec {
    JobSpec::new(name, &config.images.check_run)
        .env(check_env::PAYLOAD, &event.payload)
        .env(check_env::NAME, CHECK_NAME)
        .env(check_env::TITLE, CHECK_TITLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kashti_config::Secrets;
    use kashti_core::event::{EventKind, Revision};

    fn config() -> ProjectConfig {
        ProjectConfig::default_for("kashti").with_secrets(Secrets {
            gh_token: "gh-secret".to_string(),
            registry: "myregistry".to_string(),
            registry_token: "sp-secret".to_string(),
            registry_tenant: "tenant-id".to_string(),
        })
    }

    fn event() -> Event {
        Event {
            kind: EventKind::Push,
            build_id: "01234".to_string(),
            payload: r#"{"ref": "refs/heads/master"}"#.to_string(),
            revision: Revision {
                commit: "deadbeef".to_string(),
                r#ref: "refs/heads/master".to_string(),
            },
        }
    }

    #[test]
    fn test_test_job_shape() {
        let job = test_job(&config());
        assert_eq!(job.name, "kashti-test");
        assert_eq!(job.image, "node:8");
        assert_eq!(job.tasks[0], "cd /src");
        assert!(job.tasks.contains(&"ng lint".to_string()));
    }

    #[test]
    fn test_registry_build_job_tags_image() {
        let job = registry_build_job(&config(), "kashti-release", "v1.2.0");
        assert_eq!(job.image, "microsoft/azure-cli:latest");
        assert!(
            job.tasks
                .iter()
                .any(|t| t.contains("-t kashti:v1.2.0") && t.contains("-r myregistry"))
        );
        assert_eq!(
            job.env.get("ACR_TOKEN").map(String::as_str),
            Some("sp-secret")
        );
    }

    #[test]
    fn test_commit_status_job_required_fields() {
        let job = commit_status_job(&config(), &event(), CommitState::Pending, "build started");

        assert_eq!(job.name, "notify-pending");
        assert_eq!(
            job.env.get(status_env::REPO).map(String::as_str),
            Some("deis/kashti")
        );
        assert_eq!(
            job.env.get(status_env::STATE).map(String::as_str),
            Some("pending")
        );
        assert_eq!(
            job.env.get(status_env::COMMIT).map(String::as_str),
            Some("deadbeef")
        );
        assert_eq!(
            job.env.get(status_env::TOKEN).map(String::as_str),
            Some("gh-secret")
        );
    }

    #[test]
    fn test_check_run_job_carries_raw_payload() {
        let e = event();
        let job = check_run_job(&config(), &e, "start-run");
        assert_eq!(
            job.env.get(check_env::PAYLOAD).map(String::as_str),
            Some(e.payload.as_str())
        );
    }
}
