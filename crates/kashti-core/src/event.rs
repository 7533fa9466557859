//! Inbound event model and payload parsing.
//!
//! Events arrive from the host CI runtime as an envelope carrying an
//! opaque, JSON-shaped payload string. Parsing that payload is the only
//! place a routing call can fail.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// An inbound event from the host CI runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// What kind of event this is.
    pub kind: EventKind,
    /// Host-assigned build identifier.
    pub build_id: String,
    /// Raw provider payload, JSON-shaped text. Parsed lazily per kind.
    pub payload: String,
    /// The revision the event refers to.
    pub revision: Revision,
}

/// Commit/ref pair an event refers to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Revision {
    /// Full commit SHA.
    pub commit: String,
    /// Git ref (e.g. "refs/heads/master").
    pub r#ref: String,
}

/// Kinds of events the router understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Push to a branch or tag.
    Push,
    /// GitHub check suite requested.
    CheckSuiteRequested,
    /// GitHub check suite re-requested.
    CheckSuiteRerequested,
    /// GitHub check run re-requested.
    CheckRunRerequested,
    /// Manual trigger.
    Exec,
    /// Anything else. Routed to the empty pipeline, never an error.
    Unknown(String),
}

impl EventKind {
    /// Parse the host runtime's event name.
    pub fn parse(name: &str) -> Self {
        match name {
            "push" => EventKind::Push,
            "check_suite:requested" => EventKind::CheckSuiteRequested,
            "check_suite:rerequested" => EventKind::CheckSuiteRerequested,
            "check_run:rerequested" => EventKind::CheckRunRerequested,
            "exec" => EventKind::Exec,
            other => EventKind::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Push => write!(f, "push"),
            EventKind::CheckSuiteRequested => write!(f, "check_suite:requested"),
            EventKind::CheckSuiteRerequested => write!(f, "check_suite:rerequested"),
            EventKind::CheckRunRerequested => write!(f, "check_run:rerequested"),
            EventKind::Exec => write!(f, "exec"),
            EventKind::Unknown(name) => write!(f, "{}", name),
        }
    }
}

/// Parsed view of a push event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPayload {
    /// The pushed ref (e.g. "refs/tags/v1.2.0").
    pub r#ref: String,
}

impl PushPayload {
    /// Parse a push payload from raw JSON text.
    pub fn from_payload(payload: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| Error::MalformedEvent(format!("push payload is not JSON: {}", e)))?;

        let r#ref = value
            .get("ref")
            .and_then(|r| r.as_str())
            .ok_or_else(|| Error::MalformedEvent("push payload missing 'ref'".to_string()))?
            .to_string();

        Ok(Self { r#ref })
    }

    /// Branch name, if the ref is a branch ref.
    pub fn branch(&self) -> Option<&str> {
        self.r#ref.strip_prefix("refs/heads/")
    }

    /// Tag name, if the ref is a tag ref.
    pub fn tag(&self) -> Option<&str> {
        self.r#ref.strip_prefix("refs/tags/")
    }

    /// Final segment of the ref, used as the release image tag
    /// ("refs/tags/v1.2.0" -> "v1.2.0", "refs/heads/master" -> "master").
    pub fn ref_name(&self) -> &str {
        self.r#ref.splitn(3, '/').nth(2).unwrap_or(&self.r#ref)
    }
}

/// Parsed view of a check request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckPayload {
    /// Head commit SHA the check should run against.
    pub head_sha: String,
}

impl CheckPayload {
    /// Parse a check_suite/check_run payload from raw JSON text.
    ///
    /// The head SHA lives at `check_suite.head_sha` for suite events and
    /// under `check_run.check_suite.head_sha` (or `check_run.head_sha`)
    /// for run events.
    pub fn from_payload(payload: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| Error::MalformedEvent(format!("check payload is not JSON: {}", e)))?;

        let head_sha = value
            .get("check_suite")
            .and_then(|s| s.get("head_sha"))
            .or_else(|| {
                value
                    .get("check_run")
                    .and_then(|r| r.get("check_suite"))
                    .and_then(|s| s.get("head_sha"))
            })
            .or_else(|| value.get("check_run").and_then(|r| r.get("head_sha")))
            .and_then(|s| s.as_str())
            .ok_or_else(|| Error::MalformedEvent("check payload missing head_sha".to_string()))?
            .to_string();

        Ok(Self { head_sha })
    }

    /// First 7 characters of the head SHA. Char-boundary safe: the
    /// payload is externally supplied and need not be ASCII hex.
    pub fn short_sha(&self) -> &str {
        match self.head_sha.char_indices().nth(7) {
            Some((index, _)) => &self.head_sha[..index],
            None => &self.head_sha,
        }
    }
}
