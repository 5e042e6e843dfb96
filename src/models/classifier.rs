//! Classifier capability
//!
//! The gateway only ever needs two things from a fitted model: discrete
//! labels and class probabilities for a batch of rows. Anything exposing
//! both can stand behind a [`ClassifierHandle`].

use crate::error::InferenceError;
use std::sync::Arc;

/// A pre-fitted binary classifier.
///
/// `rows` is a two-dimensional input, one inner `Vec` per row. Implementors
/// must not mutate observable state while scoring.
pub trait Classifier: Send + Sync {
    /// Name used in logs and the health endpoint
    fn name(&self) -> &str;

    /// Number of input columns, when the artifact declares it
    fn input_width(&self) -> Option<usize> {
        None
    }

    /// Predicted label code per row
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>, InferenceError>;

    /// `[p(class 0), p(class 1)]` per row
    fn predict_probabilities(&self, rows: &[Vec<f64>]) -> Result<Vec<[f64; 2]>, InferenceError>;

    /// Labels and probabilities from the same evaluation.
    ///
    /// Backends that produce both in one pass should override this.
    fn predict_with_probabilities(
        &self,
        rows: &[Vec<f64>],
    ) -> Result<(Vec<i64>, Vec<[f64; 2]>), InferenceError> {
        Ok((self.predict(rows)?, self.predict_probabilities(rows)?))
    }
}

/// Shared, read-only handle to the loaded classifier
pub type ClassifierHandle = Arc<dyn Classifier>;

#[cfg(test)]
pub(crate) mod testing {
    //! Stub classifiers for tests across the crate

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed label and distribution for every row
    pub struct FixedClassifier {
        pub label: i64,
        pub probabilities: [f64; 2],
        pub calls: AtomicUsize,
    }

    impl FixedClassifier {
        pub fn new(label: i64, probabilities: [f64; 2]) -> Self {
            Self {
                label,
                probabilities,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn handle(label: i64, probabilities: [f64; 2]) -> ClassifierHandle {
            Arc::new(Self::new(label, probabilities))
        }
    }

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>, InferenceError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(vec![self.label; rows.len()])
        }

        fn predict_probabilities(
            &self,
            rows: &[Vec<f64>],
        ) -> Result<Vec<[f64; 2]>, InferenceError> {
            Ok(vec![self.probabilities; rows.len()])
        }
    }

    /// Flags a row as fraud when its amount exceeds a threshold
    pub struct AmountThresholdClassifier {
        pub threshold: f64,
    }

    impl AmountThresholdClassifier {
        fn fraud_probability(&self, row: &[f64]) -> f64 {
            let amount = row.last().copied().unwrap_or(0.0);
            if amount > self.threshold {
                0.9
            } else {
                0.1
            }
        }
    }

    impl Classifier for AmountThresholdClassifier {
        fn name(&self) -> &str {
            "amount_threshold"
        }

        fn input_width(&self) -> Option<usize> {
            Some(6)
        }

        fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>, InferenceError> {
            Ok(rows
                .iter()
                .map(|row| (self.fraud_probability(row) > 0.5) as i64)
                .collect())
        }

        fn predict_probabilities(
            &self,
            rows: &[Vec<f64>],
        ) -> Result<Vec<[f64; 2]>, InferenceError> {
            Ok(rows
                .iter()
                .map(|row| {
                    let p = self.fraud_probability(row);
                    [1.0 - p, p]
                })
                .collect())
        }
    }

    /// Fails every scoring call
    pub struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict(&self, _rows: &[Vec<f64>]) -> Result<Vec<i64>, InferenceError> {
            Err(InferenceError::Scoring("backend unavailable".to_string()))
        }

        fn predict_probabilities(
            &self,
            _rows: &[Vec<f64>],
        ) -> Result<Vec<[f64; 2]>, InferenceError> {
            Err(InferenceError::Scoring("backend unavailable".to_string()))
        }
    }
}
