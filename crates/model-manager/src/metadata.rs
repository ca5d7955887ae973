//! Model metadata
//!
//! Describes the loaded artifact for logging and the `/model` endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::models::Species;

/// Descriptive metadata of a loaded model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name
    pub name: String,

    /// Model version
    pub version: String,

    /// Model description
    pub description: String,

    /// When the artifact was trained, if recorded
    pub trained_at: Option<DateTime<Utc>>,

    /// Artifact format version
    pub format_version: u32,

    /// Estimator kind
    pub estimator: String,

    /// Feature names in input order
    pub feature_names: Vec<String>,

    /// Class labels in class-index order
    pub classes: Vec<Species>,

    /// Artifact path on disk
    pub path: String,

    /// Artifact size in bytes
    pub size_bytes: u64,

    /// SHA-256 of the artifact file, hex encoded
    pub sha256: String,

    /// When this replica loaded the artifact
    pub loaded_at: DateTime<Utc>,
}
