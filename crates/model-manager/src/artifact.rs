//! Model artifact format
//!
//! The trained classifier ships as a JSON document describing the estimator
//! parameters, the feature schema it was trained on and its class labels.
//! Everything the inference engine relies on is checked here, once, at load
//! time.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::error::{Error, Result};
use common::models::{Species, FEATURE_COUNT, FEATURE_NAMES};

/// Artifact format version understood by this loader
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// Serialized trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Artifact format version
    pub format_version: u32,

    /// Model name
    pub name: String,

    /// Model version
    pub version: String,

    /// Model description
    #[serde(default)]
    pub description: String,

    /// When the training run produced this artifact
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,

    /// Feature names in input order
    pub feature_names: Vec<String>,

    /// Class labels in class-index order
    pub classes: Vec<String>,

    /// Estimator parameters
    pub estimator: EstimatorSpec,
}

/// Estimator parameters, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EstimatorSpec {
    /// Multinomial logistic regression
    LogisticRegression {
        /// One row of feature weights per class
        coefficients: Vec<Vec<f64>>,
        /// One bias per class
        intercepts: Vec<f64>,
    },
    /// Ensemble of decision trees whose leaf distributions are averaged
    DecisionForest {
        /// Member trees
        trees: Vec<TreeSpec>,
    },
}

impl EstimatorSpec {
    /// Estimator kind as written in the artifact
    pub fn kind(&self) -> &'static str {
        match self {
            EstimatorSpec::LogisticRegression { .. } => "logistic_regression",
            EstimatorSpec::DecisionForest { .. } => "decision_forest",
        }
    }
}

/// A decision tree stored as a flat node list rooted at node 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSpec {
    /// Tree nodes
    pub nodes: Vec<NodeSpec>,
}

/// A decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeSpec {
    /// Internal node: samples with `x[feature] <= threshold` go left
    Split {
        /// Feature index
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Index of the left child
        left: usize,
        /// Index of the right child
        right: usize,
    },
    /// Terminal node holding per-class weights
    Leaf {
        /// Class weights (sample counts or probabilities)
        value: Vec<f64>,
    },
}

impl ModelArtifact {
    /// Parses an artifact from raw file contents
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Model(format!("Corrupt model artifact: {}", e)))
    }

    /// Checks the artifact against the feature schema and class list and
    /// returns the classes in class-index order
    pub fn validate(&self) -> Result<Vec<Species>> {
        if self.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(Error::Model(format!(
                "Unsupported artifact format version {} (expected {})",
                self.format_version, SUPPORTED_FORMAT_VERSION
            )));
        }

        if self.feature_names.len() != FEATURE_COUNT
            || self
                .feature_names
                .iter()
                .zip(FEATURE_NAMES)
                .any(|(name, expected)| name != expected)
        {
            return Err(Error::Model(format!(
                "Artifact features {:?} do not match the expected schema {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }

        let classes = self.species()?;

        match &self.estimator {
            EstimatorSpec::LogisticRegression {
                coefficients,
                intercepts,
            } => validate_linear(coefficients, intercepts, classes.len())?,
            EstimatorSpec::DecisionForest { trees } => validate_forest(trees, classes.len())?,
        }

        Ok(classes)
    }

    fn species(&self) -> Result<Vec<Species>> {
        let classes = self
            .classes
            .iter()
            .map(|label| label.parse::<Species>())
            .collect::<Result<Vec<_>>>()?;

        let distinct: HashSet<_> = classes.iter().collect();
        if classes.len() != Species::ALL.len() || distinct.len() != classes.len() {
            return Err(Error::Model(format!(
                "Artifact classes {:?} must name each of {:?} exactly once",
                self.classes,
                Species::ALL.map(|s| s.as_str())
            )));
        }

        Ok(classes)
    }
}

fn validate_linear(coefficients: &[Vec<f64>], intercepts: &[f64], n_classes: usize) -> Result<()> {
    if coefficients.len() != n_classes || intercepts.len() != n_classes {
        return Err(Error::Model(format!(
            "Logistic regression has {} coefficient rows and {} intercepts for {} classes",
            coefficients.len(),
            intercepts.len(),
            n_classes
        )));
    }

    for (class, row) in coefficients.iter().enumerate() {
        if row.len() != FEATURE_COUNT {
            return Err(Error::Model(format!(
                "Coefficient row {} has {} weights, expected {}",
                class,
                row.len(),
                FEATURE_COUNT
            )));
        }
    }

    if coefficients.iter().flatten().chain(intercepts).any(|w| !w.is_finite()) {
        return Err(Error::Model("Logistic regression parameters must be finite".to_string()));
    }

    Ok(())
}

fn validate_forest(trees: &[TreeSpec], n_classes: usize) -> Result<()> {
    if trees.is_empty() {
        return Err(Error::Model("Decision forest has no trees".to_string()));
    }

    for (t, tree) in trees.iter().enumerate() {
        if tree.nodes.is_empty() {
            return Err(Error::Model(format!("Tree {} has no nodes", t)));
        }

        let len = tree.nodes.len();
        for (i, node) in tree.nodes.iter().enumerate() {
            match node {
                NodeSpec::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(Error::Model(format!(
                            "Tree {} node {} splits on feature {} (only {} features)",
                            t, i, feature, FEATURE_COUNT
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(Error::Model(format!(
                            "Tree {} node {} has a non-finite threshold",
                            t, i
                        )));
                    }
                    // Children must point forward so traversal always terminates
                    for child in [*left, *right] {
                        if child <= i || child >= len {
                            return Err(Error::Model(format!(
                                "Tree {} node {} has invalid child index {}",
                                t, i, child
                            )));
                        }
                    }
                }
                NodeSpec::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(Error::Model(format!(
                            "Tree {} leaf {} has {} class weights, expected {}",
                            t,
                            i,
                            value.len(),
                            n_classes
                        )));
                    }
                    if value.iter().any(|w| !w.is_finite() || *w < 0.0)
                        || value.iter().sum::<f64>() <= 0.0
                    {
                        return Err(Error::Model(format!(
                            "Tree {} leaf {} needs non-negative weights with a positive sum",
                            t, i
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}
