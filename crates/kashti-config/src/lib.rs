//! KDL configuration parsing for kashti CI orchestration.
//!
//! This crate handles:
//! - Project definitions (kashti.kdl)
//! - Secret material read from the environment

pub mod error;
pub mod project;

pub use error::{ConfigError, ConfigResult};
pub use project::{ImageCatalog, ProjectConfig, Secrets};
