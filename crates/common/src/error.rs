//! Error types for the common crate
//!
//! This module defines the common error types used throughout the service.

use thiserror::Error;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for service operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model artifact error (missing, corrupt, incompatible)
    #[error("Model error: {0}")]
    Model(String),

    /// Request payload failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Inference error
    #[error("Inference error: {0}")]
    Inference(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::NotFound(_))
    }

    /// Returns true if the error is a model artifact error
    pub fn is_model(&self) -> bool {
        matches!(self, Error::Model(_))
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Config(_) => "config_error",
            Error::Model(_) => "model_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::Inference(_) => "inference_error",
            Error::NotFound(_) => "not_found",
            Error::Internal(_) => "internal_error",
        }
    }
}
