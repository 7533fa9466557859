//! Event-to-pipeline routing for kashti CI orchestration.
//!
//! The router is the pure half of the system: given an inbound event
//! and a project configuration it decides which jobs to run, in what
//! order, and how the outcome is reported. Execution lives in
//! kashti-runner.

pub mod jobs;
pub mod router;

pub use router::EventRouter;
