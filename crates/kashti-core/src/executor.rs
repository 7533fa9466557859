//! Executor trait - the boundary to the host job runtime.
//!
//! The core never runs containers itself. A fully-populated [`JobSpec`]
//! is handed to an executor and only success/failure plus log text come
//! back.

use async_trait::async_trait;
use futures::future::join_all;

use crate::Result;
use crate::job::{JobOutcome, JobSpec};

/// Trait for job executors.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Name of this executor.
    fn name(&self) -> &'static str;

    /// Execute a single job to completion.
    async fn execute(&self, spec: JobSpec) -> Result<JobOutcome>;

    /// Execute a batch of jobs concurrently, returning each job's
    /// outcome keyed by name. A transport error for one job does not
    /// abort the others.
    async fn execute_batch(&self, specs: Vec<JobSpec>) -> Vec<(String, Result<JobOutcome>)> {
        let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
        let outcomes = join_all(specs.into_iter().map(|spec| self.execute(spec))).await;
        names.into_iter().zip(outcomes).collect()
    }
}
