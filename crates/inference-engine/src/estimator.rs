//! Runnable estimators
//!
//! Each estimator maps a feature vector to a probability distribution over
//! the model's classes, in class-index order.

use ndarray::{Array1, Array2, ArrayView1};

use common::error::{Error, Result};
use model_manager::{EstimatorSpec, NodeSpec, TreeSpec};

/// A trained classifier ready for inference
pub trait Estimator: Send + Sync {
    /// Estimator kind, as named in the artifact
    fn kind(&self) -> &'static str;

    /// Number of classes in the output distribution
    fn n_classes(&self) -> usize;

    /// Class probabilities for one feature vector
    fn predict_proba(&self, x: ArrayView1<'_, f64>) -> Array1<f64>;
}

/// Builds a runnable estimator from validated artifact parameters
pub fn build_estimator(spec: &EstimatorSpec) -> Result<Box<dyn Estimator>> {
    match spec {
        EstimatorSpec::LogisticRegression {
            coefficients,
            intercepts,
        } => Ok(Box::new(LogisticRegression::new(coefficients, intercepts)?)),
        EstimatorSpec::DecisionForest { trees } => Ok(Box::new(DecisionForest::new(trees)?)),
    }
}

/// Multinomial logistic regression
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    /// Weights, one row per class
    coefficients: Array2<f64>,
    /// Biases, one per class
    intercepts: Array1<f64>,
}

impl LogisticRegression {
    /// Creates the estimator from row-major weights and per-class biases
    pub fn new(coefficients: &[Vec<f64>], intercepts: &[f64]) -> Result<Self> {
        let n_classes = coefficients.len();
        let n_features = coefficients.first().map(Vec::len).unwrap_or(0);

        if n_classes == 0 || intercepts.len() != n_classes {
            return Err(Error::Model(format!(
                "Logistic regression needs one intercept per class ({} rows, {} intercepts)",
                n_classes,
                intercepts.len()
            )));
        }

        let flat: Vec<f64> = coefficients.iter().flatten().copied().collect();
        let coefficients = Array2::from_shape_vec((n_classes, n_features), flat)
            .map_err(|e| Error::Model(format!("Ragged coefficient matrix: {}", e)))?;

        Ok(Self {
            coefficients,
            intercepts: Array1::from(intercepts.to_vec()),
        })
    }
}

impl Estimator for LogisticRegression {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn n_classes(&self) -> usize {
        self.intercepts.len()
    }

    fn predict_proba(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        let logits = self.coefficients.dot(&x) + &self.intercepts;
        if !logits.iter().any(|v| v.is_nan()) {
            return softmax(&logits);
        }

        // Overflowing terms of opposite sign cancelled to NaN. Evaluate on the
        // input scaled into [-1, 1], then scale the logits back up; products
        // that overflow again saturate to +/-inf instead of NaN.
        let scale = x.fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if !(scale.is_finite() && scale > 0.0) {
            return softmax(&logits);
        }
        let scaled = self.coefficients.dot(&x.mapv(|v| v / scale)) + &self.intercepts / scale;
        softmax(&(scaled * scale))
    }
}

/// Numerically stable softmax
///
/// When the largest logit is infinite, probability mass is split evenly
/// between the logits that reach it.
pub fn softmax(logits: &Array1<f64>) -> Array1<f64> {
    let max = logits.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));

    let weights = if max.is_infinite() {
        logits.mapv(|v| if v == max { 1.0 } else { 0.0 })
    } else {
        logits.mapv(|v| (v - max).exp())
    };

    let total = weights.sum();
    weights / total
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(Array1<f64>),
}

/// A single decision tree with normalized leaf distributions
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn new(spec: &TreeSpec) -> Result<Self> {
        let nodes = spec
            .nodes
            .iter()
            .map(|node| match node {
                NodeSpec::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => Ok(Node::Split {
                    feature: *feature,
                    threshold: *threshold,
                    left: *left,
                    right: *right,
                }),
                NodeSpec::Leaf { value } => {
                    let total: f64 = value.iter().sum();
                    if total <= 0.0 {
                        return Err(Error::Model("Leaf with zero total weight".to_string()));
                    }
                    Ok(Node::Leaf(Array1::from(value.clone()) / total))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        if nodes.is_empty() {
            return Err(Error::Model("Tree has no nodes".to_string()));
        }

        Ok(Self { nodes })
    }

    /// Distribution stored in the leaf that `x` falls into
    fn leaf(&self, x: ArrayView1<'_, f64>) -> &Array1<f64> {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf(distribution) => return distribution,
            }
        }
    }
}

/// Decision forest averaging the leaf distributions of its trees
#[derive(Debug, Clone)]
pub struct DecisionForest {
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl DecisionForest {
    /// Creates the forest from validated tree specs
    pub fn new(trees: &[TreeSpec]) -> Result<Self> {
        let trees = trees
            .iter()
            .map(DecisionTree::new)
            .collect::<Result<Vec<_>>>()?;

        let n_classes = trees
            .iter()
            .flat_map(|tree| tree.nodes.iter())
            .find_map(|node| match node {
                Node::Leaf(distribution) => Some(distribution.len()),
                Node::Split { .. } => None,
            })
            .ok_or_else(|| Error::Model("Decision forest has no leaves".to_string()))?;

        Ok(Self { trees, n_classes })
    }
}

impl Estimator for DecisionForest {
    fn kind(&self) -> &'static str {
        "decision_forest"
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut sum = Array1::<f64>::zeros(self.n_classes);
        for tree in &self.trees {
            sum += tree.leaf(x);
        }
        sum / self.trees.len() as f64
    }
}
