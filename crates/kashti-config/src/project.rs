//! Project configuration parsing.

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use serde::{Deserialize, Serialize};

/// Container images the routed jobs run in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCatalog {
    /// Image for lint/test and e2e jobs.
    pub node: String,
    /// Cloud registry CLI image for release builds.
    pub registry_cli: String,
    /// Commit-status notification image.
    pub notify: String,
    /// Check-run notification image.
    pub check_run: String,
}

impl Default for ImageCatalog {
    fn default() -> Self {
        Self {
            node: "node:8".to_string(),
            registry_cli: "microsoft/azure-cli:latest".to_string(),
            notify: "technosophos/github-notify:latest".to_string(),
            check_run: "technosophos/brigade-github-check-run:latest".to_string(),
        }
    }
}

/// Secret material passed through opaquely as job env entries.
///
/// Never parsed or validated here; missing secrets become empty strings
/// and the downstream service rejects them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secrets {
    /// GitHub token for status reporting.
    pub gh_token: String,
    /// Container registry name.
    pub registry: String,
    /// Registry service-principal token.
    pub registry_token: String,
    /// Registry tenant.
    pub registry_tenant: String,
}

impl Secrets {
    /// Read secrets from the environment.
    pub fn from_env() -> Self {
        Self {
            gh_token: std::env::var("KASHTI_GH_TOKEN").unwrap_or_default(),
            registry: std::env::var("KASHTI_REGISTRY").unwrap_or_default(),
            registry_token: std::env::var("KASHTI_REGISTRY_TOKEN").unwrap_or_default(),
            registry_tenant: std::env::var("KASHTI_REGISTRY_TENANT").unwrap_or_default(),
        }
    }
}

/// A project definition: everything routing needs besides the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name; prefixes job names and names release images.
    pub name: String,
    /// Repository in "owner/name" form, reported in commit statuses.
    pub repo: String,
    /// Default branch; pushes to it trigger release builds.
    pub default_branch: String,
    /// Directory inside build containers holding the checked-out source.
    pub source_dir: String,
    /// Context string attached to commit statuses.
    pub status_context: String,
    /// Container images for the routed jobs.
    pub images: ImageCatalog,
    /// Secret material, carried opaquely into job env.
    pub secrets: Secrets,
}

impl ProjectConfig {
    /// A config with defaults for everything but the project name.
    pub fn default_for(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            repo: format!("deis/{}", name),
            default_branch: "master".to_string(),
            source_dir: "/src".to_string(),
            status_context: "kashti-ci".to_string(),
            images: ImageCatalog::default(),
            secrets: Secrets::default(),
            name,
        }
    }

    /// The default branch as a full git ref.
    pub fn default_branch_ref(&self) -> String {
        format!("refs/heads/{}", self.default_branch)
    }

    /// Parse a project configuration from KDL text. Secrets are not
    /// part of the file; layer them with [`ProjectConfig::with_secrets`].
    pub fn parse(kdl: &str) -> ConfigResult<Self> {
        let doc: KdlDocument = kdl.parse()?;

        let project = doc
            .nodes()
            .iter()
            .find(|n| n.name().value() == "project")
            .ok_or_else(|| ConfigError::MissingField("project".to_string()))?;

        let name = get_first_string_arg(project)
            .ok_or_else(|| ConfigError::MissingField("project name".to_string()))?;

        let mut config = ProjectConfig::default_for(name);

        if let Some(children) = project.children() {
            for child in children.nodes() {
                match child.name().value() {
                    "repo" => {
                        config.repo = get_first_string_arg(child)
                            .ok_or_else(|| ConfigError::MissingField("repo".to_string()))?;
                    }
                    "default-branch" => {
                        if let Some(branch) = get_first_string_arg(child) {
                            if branch.is_empty() {
                                return Err(ConfigError::InvalidValue {
                                    field: "default-branch".to_string(),
                                    message: "must not be empty".to_string(),
                                });
                            }
                            config.default_branch = branch;
                        }
                    }
                    "source-dir" => {
                        if let Some(dir) = get_first_string_arg(child) {
                            config.source_dir = dir;
                        }
                    }
                    "status-context" => {
                        if let Some(context) = get_first_string_arg(child) {
                            config.status_context = context;
                        }
                    }
                    "images" => parse_images(child, &mut config.images),
                    _ => {} // Ignore unknown nodes
                }
            }
        }

        Ok(config)
    }

    /// Read and parse a project configuration file.
    pub fn from_file(path: &str) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn with_secrets(mut self, secrets: Secrets) -> Self {
        self.secrets = secrets;
        self
    }
}

fn parse_images(node: &KdlNode, images: &mut ImageCatalog) {
    if let Some(children) = node.children() {
        for child in children.nodes() {
            let Some(image) = get_first_string_arg(child) else {
                continue;
            };
            match child.name().value() {
                "node" => images.node = image,
                "registry-cli" => images.registry_cli = image,
                "notify" => images.notify = image,
                "check-run" => images.check_run = image,
                _ => {}
            }
        }
    }
}

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_project() {
        let kdl = r#"
            project "kashti"
        "#;

        let config = ProjectConfig::parse(kdl).unwrap();
        assert_eq!(config.name, "kashti");
        assert_eq!(config.repo, "deis/kashti");
        assert_eq!(config.default_branch, "master");
        assert_eq!(config.images.node, "node:8");
    }

    #[test]
    fn test_parse_full_project() {
        let kdl = r#"
            project "kashti" {
                repo "deis/kashti"
                default-branch "main"
                source-dir "/workspace"
                status-context "ci/kashti"
                images {
                    node "node:10"
                    registry-cli "mcr.microsoft.com/azure-cli:2.0"
                }
            }
        "#;

        let config = ProjectConfig::parse(kdl).unwrap();
        assert_eq!(config.default_branch, "main");
        assert_eq!(config.default_branch_ref(), "refs/heads/main");
        assert_eq!(config.source_dir, "/workspace");
        assert_eq!(config.status_context, "ci/kashti");
        assert_eq!(config.images.node, "node:10");
        assert_eq!(config.images.registry_cli, "mcr.microsoft.com/azure-cli:2.0");
        // Untouched entries keep their defaults.
        assert_eq!(config.images.notify, "technosophos/github-notify:latest");
    }

    #[test]
    fn test_parse_missing_project_node() {
        let result = ProjectConfig::parse(r#"repo "deis/kashti""#);
        assert!(matches!(result.unwrap_err(), ConfigError::MissingField(_)));
    }

    #[test]
    fn test_parse_empty_default_branch_rejected() {
        let kdl = r#"
            project "kashti" {
                default-branch ""
            }
        "#;

        let result = ProjectConfig::parse(kdl);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_with_secrets() {
        let secrets = Secrets {
            gh_token: "tok".to_string(),
            registry: "myregistry".to_string(),
            registry_token: "rtok".to_string(),
            registry_tenant: "tenant".to_string(),
        };

        let config = ProjectConfig::default_for("kashti").with_secrets(secrets.clone());
        assert_eq!(config.secrets, secrets);
    }
}
