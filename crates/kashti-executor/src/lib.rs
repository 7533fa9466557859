//! Job execution backends for kashti CI orchestration.
//!
//! The real execution environment is the host CI runtime; this crate
//! only carries the dry-run backend used for local inspection and
//! tests.

pub mod dry_run;

pub use dry_run::DryRunExecutor;
pub use kashti_core::executor::Executor;
pub use kashti_core::job::{JobOutcome, JobSpec};
