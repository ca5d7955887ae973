//! Model loader implementation
//!
//! This module reads the model artifact from local disk exactly once,
//! verifies its checksum when one is configured, and validates it before
//! handing it to the inference engine.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use bytesize::ByteSize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use common::error::{Error, Result};
use common::models::Species;

use crate::artifact::ModelArtifact;
use crate::metadata::ModelMetadata;

/// A validated artifact held for the process lifetime
#[derive(Debug, Clone)]
pub struct LoadedModel {
    /// Parsed artifact
    artifact: ModelArtifact,

    /// Classes in class-index order
    classes: Vec<Species>,

    /// Descriptive metadata
    metadata: ModelMetadata,
}

impl LoadedModel {
    /// Builds a loaded model from an artifact already in memory
    pub fn from_artifact(artifact: ModelArtifact, path: &Path, bytes: &[u8]) -> Result<Self> {
        let classes = artifact.validate()?;

        let metadata = ModelMetadata {
            name: artifact.name.clone(),
            version: artifact.version.clone(),
            description: artifact.description.clone(),
            trained_at: artifact.trained_at,
            format_version: artifact.format_version,
            estimator: artifact.estimator.kind().to_string(),
            feature_names: artifact.feature_names.clone(),
            classes: classes.clone(),
            path: path.display().to_string(),
            size_bytes: bytes.len() as u64,
            sha256: sha256_hex(bytes),
            loaded_at: chrono::Utc::now(),
        };

        Ok(Self {
            artifact,
            classes,
            metadata,
        })
    }

    /// Gets the parsed artifact
    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Gets the classes in class-index order
    pub fn classes(&self) -> &[Species] {
        &self.classes
    }

    /// Gets the model metadata
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

/// Loads the model artifact from local disk
#[derive(Debug, Clone)]
pub struct ModelLoader {
    /// Artifact path
    path: PathBuf,

    /// Expected SHA-256 of the artifact file, lowercase hex
    expected_sha256: Option<String>,
}

impl ModelLoader {
    /// Creates a loader for the artifact at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            expected_sha256: None,
        }
    }

    /// Requires the artifact file to hash to `digest`
    pub fn with_checksum(mut self, digest: Option<String>) -> Self {
        self.expected_sha256 = digest.map(|d| d.to_lowercase());
        self
    }

    /// Reads, verifies and validates the artifact
    pub async fn load(&self) -> Result<LoadedModel> {
        let start = Instant::now();

        info!("Loading model artifact from {:?}", self.path);

        let bytes = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                Error::Model(format!("Model artifact not found: {:?}", self.path))
            }
            _ => Error::Model(format!("Failed to read model artifact {:?}: {}", self.path, e)),
        })?;

        debug!("Read {} from {:?}", ByteSize(bytes.len() as u64), self.path);

        if let Some(expected) = &self.expected_sha256 {
            let actual = sha256_hex(&bytes);
            if &actual != expected {
                return Err(Error::Model(format!(
                    "Checksum mismatch for {:?}: expected {}, got {}",
                    self.path, expected, actual
                )));
            }
            debug!("Artifact checksum verified");
        }

        let artifact = ModelArtifact::from_slice(&bytes)?;
        let model = LoadedModel::from_artifact(artifact, &self.path, &bytes)?;

        let metadata = model.metadata();
        info!(
            "Model {} v{} ({}) loaded in {:?}: {}, sha256 {}",
            metadata.name,
            metadata.version,
            metadata.estimator,
            start.elapsed(),
            ByteSize(metadata.size_bytes),
            metadata.sha256
        );

        Ok(model)
    }
}

/// Hex-encoded SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SHIPPED_ARTIFACT: &str =
        concat!(env!("CARGO_MANIFEST_DIR"), "/../../models/iris_classifier.json");

    fn write_temp(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_shipped_artifact() {
        let model = ModelLoader::new(SHIPPED_ARTIFACT).load().await.unwrap();
        assert_eq!(model.classes(), &Species::ALL);
        assert_eq!(model.metadata().estimator, "logistic_regression");
        assert_eq!(model.metadata().sha256.len(), 64);
        assert!(model.metadata().size_bytes > 0);
    }

    #[tokio::test]
    async fn test_missing_artifact_fails() {
        let err = ModelLoader::new("/nonexistent/iris_classifier.json")
            .load()
            .await
            .unwrap_err();
        assert!(err.is_model());
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_corrupt_artifact_fails() {
        let file = write_temp(b"{\"format_version\": 1, \"name\": ");
        let err = ModelLoader::new(file.path()).load().await.unwrap_err();
        assert!(err.is_model());
    }

    #[tokio::test]
    async fn test_checksum_verification() {
        let bytes = std::fs::read(SHIPPED_ARTIFACT).unwrap();
        let file = write_temp(&bytes);
        let digest = sha256_hex(&bytes);

        let model = ModelLoader::new(file.path())
            .with_checksum(Some(digest.to_uppercase()))
            .load()
            .await
            .unwrap();
        assert_eq!(model.metadata().sha256, digest);

        let err = ModelLoader::new(file.path())
            .with_checksum(Some("0".repeat(64)))
            .load()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
