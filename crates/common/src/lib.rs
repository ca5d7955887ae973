//! Common utilities and types for the iris inference service
//!
//! This crate provides shared functionality used across the service,
//! including error types, the request/response data model and the
//! service lifecycle state.

pub mod error;
pub mod models;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::*;
pub use types::*;
