//! Logistic-regression artifact stored as JSON
//!
//! ```json
//! {
//!   "model_type": "logistic_regression",
//!   "feature_names": ["V1", "V2", "V3", "V4", "V5", "Amount"],
//!   "coefficients": [-0.8, 0.6, -0.7, 0.9, -0.2, 0.0015],
//!   "intercept": -3.1
//! }
//! ```

use crate::error::InferenceError;
use crate::models::classifier::Classifier;
use serde::{Deserialize, Serialize};

pub const LOGISTIC_MODEL_TYPE: &str = "logistic_regression";

/// Fitted logistic-regression weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub model_type: String,
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            model_type: LOGISTIC_MODEL_TYPE.to_string(),
            feature_names: Vec::new(),
            coefficients,
            intercept,
        }
    }

    /// Parse and sanity-check an artifact
    pub fn from_json(bytes: &[u8]) -> Result<Self, String> {
        let model: Self = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;

        if model.model_type != LOGISTIC_MODEL_TYPE {
            return Err(format!(
                "unsupported model_type '{}' (expected '{}')",
                model.model_type, LOGISTIC_MODEL_TYPE
            ));
        }
        if !model.feature_names.is_empty() && model.feature_names.len() != model.coefficients.len()
        {
            return Err(format!(
                "{} feature names for {} coefficients",
                model.feature_names.len(),
                model.coefficients.len()
            ));
        }
        if !model.intercept.is_finite() || model.coefficients.iter().any(|w| !w.is_finite()) {
            return Err("weights must be finite".to_string());
        }

        Ok(model)
    }

    fn fraud_probability(&self, row: &[f64]) -> Result<f64, InferenceError> {
        if row.len() != self.coefficients.len() {
            return Err(InferenceError::InputWidth {
                expected: self.coefficients.len(),
                actual: row.len(),
            });
        }

        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>();

        Ok(sigmoid(z))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LogisticModel {
    fn name(&self) -> &str {
        LOGISTIC_MODEL_TYPE
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>, InferenceError> {
        rows.iter()
            .map(|row| Ok((self.fraud_probability(row)? > 0.5) as i64))
            .collect()
    }

    fn predict_probabilities(&self, rows: &[Vec<f64>]) -> Result<Vec<[f64; 2]>, InferenceError> {
        rows.iter()
            .map(|row| {
                let p = self.fraud_probability(row)?;
                Ok([1.0 - p, p])
            })
            .collect()
    }
}
