//! Notification conventions.
//!
//! A notification is a plain [`JobSpec`](crate::job::JobSpec) whose env
//! carries the fields the status-reporting images expect. The constants
//! here name those env keys; population happens in the router's job
//! constructors and the values pass through opaquely.

use serde::{Deserialize, Serialize};

/// Commit status states understood by the status-reporting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Success,
    Failure,
    Error,
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitState::Pending => write!(f, "pending"),
            CommitState::Success => write!(f, "success"),
            CommitState::Failure => write!(f, "failure"),
            CommitState::Error => write!(f, "error"),
        }
    }
}

/// Env keys consumed by the commit-status notification image.
pub mod status_env {
    pub const REPO: &str = "GH_REPO";
    pub const STATE: &str = "GH_STATE";
    pub const DESCRIPTION: &str = "GH_DESCRIPTION";
    pub const CONTEXT: &str = "GH_CONTEXT";
    pub const TOKEN: &str = "GH_TOKEN";
    pub const COMMIT: &str = "GH_COMMIT";
}

/// Env keys consumed by the check-run notification image.
pub mod check_env {
    pub const PAYLOAD: &str = "CHECK_PAYLOAD";
    pub const NAME: &str = "CHECK_NAME";
    pub const TITLE: &str = "CHECK_TITLE";
    pub const SUMMARY: &str = "CHECK_SUMMARY";
    pub const CONCLUSION: &str = "CHECK_CONCLUSION";
    pub const TEXT: &str = "CHECK_TEXT";
}
