//! Error types for model loading and inference

use std::path::PathBuf;
use thiserror::Error;

/// Failure to bring the classifier up at startup. Always fatal.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported model format '{extension}' for {} (expected .onnx or .json)", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("model file {} could not be deserialized: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("model {name} is not a six-feature binary classifier: {reason}")]
    Incompatible { name: String, reason: String },
}

/// Failure to score a single request. Recoverable at the request boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    #[error("expected {expected} input values, got {actual}")]
    InputWidth { expected: usize, actual: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("scoring failed: {0}")]
    Scoring(String),

    #[error("model produced unknown label {0}")]
    UnknownLabel(i64),

    #[error("model produced malformed output: {0}")]
    MalformedOutput(String),

    #[error("label {label} disagrees with probabilities [{p0:.4}, {p1:.4}]")]
    InconsistentLabel { label: i64, p0: f64, p1: f64 },
}
