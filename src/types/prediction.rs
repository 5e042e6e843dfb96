//! Classifier output types

use crate::error::InferenceError;
use serde::{Deserialize, Serialize};

/// Allowed deviation of the probability pair's sum from 1.0.
///
/// ONNX runtimes return `f32` probabilities, so exact models land well
/// inside this and exported ones still pass.
pub const PROBABILITY_TOLERANCE: f64 = 1e-5;

/// Binary class label, encoded 0/1 by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    NotFraud,
    Fraud,
}

impl Label {
    /// Model encoding of this label
    pub fn code(self) -> i64 {
        match self {
            Label::NotFraud => 0,
            Label::Fraud => 1,
        }
    }

    /// Index of this label's probability in the distribution
    pub fn index(self) -> usize {
        self.code() as usize
    }

    /// Human-readable class name
    pub fn display_name(self) -> &'static str {
        match self {
            Label::NotFraud => "Not Fraud",
            Label::Fraud => "Fraud",
        }
    }
}

impl TryFrom<i64> for Label {
    type Error = InferenceError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Label::NotFraud),
            1 => Ok(Label::Fraud),
            other => Err(InferenceError::UnknownLabel(other)),
        }
    }
}

/// Predicted label plus the full distribution over both classes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: Label,
    /// Indexed by label encoding: `[p(NotFraud), p(Fraud)]`
    pub probabilities: [f64; 2],
}

impl PredictionResult {
    /// Build a result from raw model output, checking every invariant
    /// the rest of the system relies on.
    pub fn from_raw(label_code: i64, probabilities: [f64; 2]) -> Result<Self, InferenceError> {
        let label = Label::try_from(label_code)?;
        let [p0, p1] = probabilities;

        if !(p0.is_finite() && p1.is_finite()) || p0 < 0.0 || p1 < 0.0 {
            return Err(InferenceError::MalformedOutput(format!(
                "probabilities must be finite and non-negative, got [{}, {}]",
                p0, p1
            )));
        }

        let sum = p0 + p1;
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(InferenceError::MalformedOutput(format!(
                "probabilities sum to {} instead of 1",
                sum
            )));
        }

        // Ties accept either label
        let consistent = match label {
            Label::NotFraud => p0 >= p1,
            Label::Fraud => p1 >= p0,
        };
        if !consistent {
            return Err(InferenceError::InconsistentLabel {
                label: label_code,
                p0,
                p1,
            });
        }

        Ok(Self {
            label,
            probabilities,
        })
    }

    /// Probability assigned to `label`
    pub fn probability(&self, label: Label) -> f64 {
        self.probabilities[label.index()]
    }

    pub fn fraud_probability(&self) -> f64 {
        self.probability(Label::Fraud)
    }
}
