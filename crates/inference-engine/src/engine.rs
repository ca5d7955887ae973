//! Inference engine
//!
//! Wraps the loaded model and its runnable estimator. The engine is
//! immutable after construction and shared across request handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use ndarray::ArrayView1;
use tracing::debug;

use common::error::{Error, Result};
use common::models::{IrisFeatures, Prediction};
use model_manager::{LoadedModel, ModelMetadata};

use crate::estimator::{build_estimator, Estimator};

/// Inference engine for the loaded classifier
pub struct InferenceEngine {
    /// Loaded model
    model: Arc<LoadedModel>,

    /// Runnable estimator built from the model's parameters
    estimator: Box<dyn Estimator>,
}

impl InferenceEngine {
    /// Creates an engine for a loaded model
    pub fn new(model: Arc<LoadedModel>) -> Result<Self> {
        let estimator = build_estimator(&model.artifact().estimator)?;

        if estimator.n_classes() != model.classes().len() {
            return Err(Error::Model(format!(
                "Estimator produces {} classes but the artifact lists {}",
                estimator.n_classes(),
                model.classes().len()
            )));
        }

        Ok(Self { model, estimator })
    }

    /// Gets the model metadata
    pub fn metadata(&self) -> &ModelMetadata {
        self.model.metadata()
    }

    /// Classifies one feature vector
    pub fn predict(&self, features: &IrisFeatures, include_probabilities: bool) -> Result<Prediction> {
        features.validate()?;

        let input = features.to_array();
        let probabilities = self.estimator.predict_proba(ArrayView1::from(&input[..]));

        if probabilities.iter().any(|p| p.is_nan()) {
            return Err(Error::InvalidInput(
                "Measurements are outside the numeric range the model can evaluate".to_string(),
            ));
        }

        // Ties resolve to the lowest class index
        let class_index = probabilities
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| if *p > probabilities[best] { i } else { best });

        let classes = self.model.classes();
        let prediction = classes
            .get(class_index)
            .copied()
            .ok_or_else(|| Error::Inference(format!("Class index {} out of range", class_index)))?;

        debug!(
            "Predicted {} (p={:.4}) for {:?}",
            prediction, probabilities[class_index], input
        );

        let probabilities = include_probabilities.then(|| {
            classes
                .iter()
                .copied()
                .zip(probabilities.iter().copied())
                .collect::<BTreeMap<_, _>>()
        });

        Ok(Prediction {
            prediction,
            class_index,
            probabilities,
        })
    }
}
