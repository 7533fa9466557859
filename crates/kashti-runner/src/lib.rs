//! Pipeline execution for kashti CI orchestration.
//!
//! Drives a routed [`Pipeline`](kashti_core::pipeline::Pipeline) against
//! an external executor: stages in order, jobs within a stage
//! concurrently, one terminal notification per run.

pub mod runner;

pub use runner::{PipelineEvent, PipelineRunner};
