//! Common data models for the iris inference service
//!
//! This module defines the request and response payloads shared between the
//! inference engine and the HTTP layer.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of measurements in a feature vector
pub const FEATURE_COUNT: usize = 4;

/// Feature names in the order the model expects them
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["sepal_length", "sepal_width", "petal_length", "petal_width"];

/// Flower measurements submitted for classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrisFeatures {
    /// Sepal length in centimetres
    pub sepal_length: f64,
    /// Sepal width in centimetres
    pub sepal_width: f64,
    /// Petal length in centimetres
    pub petal_length: f64,
    /// Petal width in centimetres
    pub petal_width: f64,
}

impl IrisFeatures {
    /// Creates a feature vector from the four measurements
    pub fn new(sepal_length: f64, sepal_width: f64, petal_length: f64, petal_width: f64) -> Self {
        Self {
            sepal_length,
            sepal_width,
            petal_length,
            petal_width,
        }
    }

    /// Returns the measurements in `FEATURE_NAMES` order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.sepal_length,
            self.sepal_width,
            self.petal_length,
            self.petal_width,
        ]
    }

    /// Rejects NaN and infinite measurements
    pub fn validate(&self) -> Result<()> {
        for (name, value) in FEATURE_NAMES.iter().zip(self.to_array()) {
            if !value.is_finite() {
                return Err(Error::InvalidInput(format!(
                    "{} must be a finite number (got {})",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

/// The three classes the classifier can predict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    /// Iris setosa
    Setosa,
    /// Iris versicolor
    Versicolor,
    /// Iris virginica
    Virginica,
}

impl Species {
    /// All species, in canonical order
    pub const ALL: [Species; 3] = [Species::Setosa, Species::Versicolor, Species::Virginica];

    /// Lowercase label used on the wire and in model artifacts
    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Setosa => "setosa",
            Species::Versicolor => "versicolor",
            Species::Virginica => "virginica",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Species {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // Training exports sometimes carry the "Iris-" prefix from the UCI dataset
        let label = s.trim().to_lowercase();
        let label = label.strip_prefix("iris-").unwrap_or(&label);

        match label {
            "setosa" => Ok(Species::Setosa),
            "versicolor" => Ok(Species::Versicolor),
            "virginica" => Ok(Species::Virginica),
            _ => Err(Error::Model(format!("Unknown species label: {}", s))),
        }
    }
}

/// Classification result for one feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted species
    pub prediction: Species,
    /// Index of the predicted class in the model's class list
    pub class_index: usize,
    /// Per-class probabilities, present only when requested
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub probabilities: Option<BTreeMap<Species, f64>>,
}
