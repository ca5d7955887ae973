//! Configuration management for the iris inference service
//!
//! This crate loads the service settings from layered sources: built-in
//! defaults, an optional config file, `IRIS_*` environment variables and
//! command-line overrides, in increasing priority.

pub mod manager;
pub mod schema;

// Re-export commonly used types
pub use manager::{ConfigManager, ConfigOverrides, ENV_PREFIX};
pub use schema::{LogConfig, LogFormat, ServiceConfig};
