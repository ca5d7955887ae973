//! Model artifact management for the iris inference service
//!
//! This crate provides functionality for reading the serialized classifier
//! from disk, verifying its integrity, validating it against the fixed
//! feature schema and class list, and describing it.

pub mod artifact;
pub mod loader;
pub mod metadata;

// Re-export commonly used types
pub use artifact::{EstimatorSpec, ModelArtifact, NodeSpec, TreeSpec, SUPPORTED_FORMAT_VERSION};
pub use loader::{LoadedModel, ModelLoader};
pub use metadata::ModelMetadata;
