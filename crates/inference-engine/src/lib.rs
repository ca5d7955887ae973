//! Model inference execution for the iris inference service
//!
//! This crate turns a validated model artifact into a runnable estimator and
//! classifies feature vectors with it.

pub mod engine;
pub mod estimator;

// Re-export commonly used types
pub use engine::InferenceEngine;
pub use estimator::{build_estimator, DecisionForest, Estimator, LogisticRegression};
