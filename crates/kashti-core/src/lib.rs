//! Core domain types and traits for kashti CI orchestration.
//!
//! This crate contains:
//! - Run identifiers and common types
//! - Inbound event model and payload parsing
//! - Job and notification specifications
//! - Pipeline, stage and run-result definitions
//! - Executor trait (the boundary to the host job runtime)

pub mod error;
pub mod event;
pub mod executor;
pub mod id;
pub mod job;
pub mod notify;
pub mod pipeline;

pub use error::{Error, Result, StageFailure};
pub use id::RunId;
