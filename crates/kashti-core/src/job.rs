//! Job specifications and outcomes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declarative description of one unit of containerized work.
///
/// A `JobSpec` is an immutable value: constructors and the chained
/// builder methods produce fully-populated specs that are handed to the
/// executor as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Job name, unique within a pipeline run.
    pub name: String,
    /// Container image to run in.
    pub image: String,
    /// Shell commands, executed in order. The first failing command
    /// aborts the rest of the sequence.
    pub tasks: Vec<String>,
    /// Environment variables.
    pub env: HashMap<String, String>,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            tasks: Vec::new(),
            env: HashMap::new(),
        }
    }

    /// Append a shell command to the task sequence.
    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.tasks.push(task.into());
        self
    }

    /// Append multiple shell commands to the task sequence.
    pub fn tasks<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tasks.extend(tasks.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Render the task sequence as a single shell command.
    pub fn shell_command(&self) -> String {
        self.tasks.join(" && ")
    }
}

/// Result of a completed job, as reported by the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Process exit code; zero means success.
    pub exit_code: i32,
    /// Captured log text, used to populate notification summaries.
    pub log: String,
}

impl JobOutcome {
    pub fn success(log: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            log: log.into(),
        }
    }

    pub fn failure(exit_code: i32, log: impl Into<String>) -> Self {
        Self {
            exit_code,
            log: log.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}
