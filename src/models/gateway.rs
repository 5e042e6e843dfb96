//! Model gateway: one loaded classifier, one narrow inference contract

use crate::config::ModelConfig;
use crate::error::{InferenceError, LoadError};
use crate::models::classifier::ClassifierHandle;
use crate::models::loader::ModelLoader;
use crate::types::features::{FeatureVector, FEATURE_COUNT};
use crate::types::prediction::PredictionResult;
use std::path::Path;
use tracing::{debug, info};

/// Owns the process-lifetime classifier handle.
///
/// Created once at startup and shared read-only; `predict` takes `&self`
/// and never mutates gateway state.
pub struct ModelGateway {
    handle: ClassifierHandle,
}

impl ModelGateway {
    /// Load the artifact at `path` with default loader settings
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Self::load_with(&ModelLoader::new(), path)
    }

    /// Load the artifact named by the `[model]` configuration section
    pub fn from_config(config: &ModelConfig) -> Result<Self, LoadError> {
        Self::load_with(&ModelLoader::with_threads(config.onnx_threads), &config.path)
    }

    fn load_with<P: AsRef<Path>>(loader: &ModelLoader, path: P) -> Result<Self, LoadError> {
        let handle = loader.load_model(path)?;
        Self::new(handle)
    }

    /// Wrap an already-constructed classifier, checking that it scores a
    /// six-column row into a two-class distribution.
    pub fn new(handle: ClassifierHandle) -> Result<Self, LoadError> {
        if let Some(width) = handle.input_width() {
            if width != FEATURE_COUNT {
                return Err(LoadError::Incompatible {
                    name: handle.name().to_string(),
                    reason: format!("expects {} input columns, not {}", width, FEATURE_COUNT),
                });
            }
        }

        let gateway = Self { handle };

        gateway
            .predict(&FeatureVector::default())
            .map_err(|e| LoadError::Incompatible {
                name: gateway.model_name().to_string(),
                reason: e.to_string(),
            })?;

        info!(model = %gateway.model_name(), "Model gateway ready");

        Ok(gateway)
    }

    /// Name of the loaded model
    pub fn model_name(&self) -> &str {
        self.handle.name()
    }

    /// Score one feature vector
    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult, InferenceError> {
        let rows = [features.to_row()];

        let (labels, probabilities) = self.handle.predict_with_probabilities(&rows)?;

        let label = single_row(labels, "labels")?;
        let probabilities = single_row(probabilities, "probability rows")?;

        let result = PredictionResult::from_raw(label, probabilities)?;

        debug!(
            model = %self.model_name(),
            label = ?result.label,
            p_not_fraud = result.probabilities[0],
            p_fraud = result.probabilities[1],
            "Prediction complete"
        );

        Ok(result)
    }

    /// Score an untyped row, rejecting any width other than six
    pub fn predict_row(&self, row: &[f64]) -> Result<PredictionResult, InferenceError> {
        let features = FeatureVector::try_from(row)?;
        self.predict(&features)
    }
}

fn single_row<T>(mut values: Vec<T>, what: &str) -> Result<T, InferenceError> {
    match values.len() {
        1 => Ok(values.remove(0)),
        n => Err(InferenceError::MalformedOutput(format!(
            "expected 1 row of {}, got {}",
            what, n
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classifier::testing::{
        AmountThresholdClassifier, FailingClassifier, FixedClassifier,
    };
    use crate::models::classifier::Classifier;
    use crate::models::linear::LogisticModel;
    use crate::types::prediction::Label;
    use std::io::Write;
    use std::sync::Arc;

    #[test]
    fn test_predict_fraud() {
        let gateway = ModelGateway::new(Arc::new(AmountThresholdClassifier {
            threshold: 1000.0,
        }))
        .unwrap();

        let features = FeatureVector::new([-2.3, 1.5, -1.8, 3.2, -0.5, 2000.0]);
        let result = gateway.predict(&features).unwrap();

        assert_eq!(result.label, Label::Fraud);
        assert!((result.probabilities[1] - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_predict_row_width() {
        let gateway = ModelGateway::new(FixedClassifier::handle(0, [0.8, 0.2])).unwrap();

        let err = gateway.predict_row(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap_err();
        assert_eq!(
            err,
            InferenceError::InputWidth {
                expected: 6,
                actual: 5
            }
        );
        assert!(gateway.predict_row(&[0.0; 6]).is_ok());
    }

    #[test]
    fn test_unknown_label_is_inference_error() {
        // Behaves until it sees a non-zero amount, then reports a third class
        struct ThirdClass;

        impl Classifier for ThirdClass {
            fn name(&self) -> &str {
                "third_class"
            }

            fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>, InferenceError> {
                Ok(rows
                    .iter()
                    .map(|row| if row[5] > 0.0 { 2 } else { 0 })
                    .collect())
            }

            fn predict_probabilities(
                &self,
                rows: &[Vec<f64>],
            ) -> Result<Vec<[f64; 2]>, InferenceError> {
                Ok(vec![[1.0, 0.0]; rows.len()])
            }
        }

        let gateway = ModelGateway::new(Arc::new(ThirdClass)).unwrap();
        let features = FeatureVector::from_parts([0.0; 5], 10.0);

        assert_eq!(
            gateway.predict(&features).unwrap_err(),
            InferenceError::UnknownLabel(2)
        );

        let err = ModelGateway::new(FixedClassifier::handle(2, [0.6, 0.4]))
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::Incompatible { .. }));
    }

    #[test]
    fn test_rejects_wrong_input_width() {
        let model = LogisticModel::new(vec![0.1; 4], 0.0);
        let err = ModelGateway::new(Arc::new(model)).err().unwrap();
        assert!(err.to_string().contains("expects 4 input columns"));
    }

    #[test]
    fn test_failing_classifier_cannot_be_loaded() {
        let err = ModelGateway::new(Arc::new(FailingClassifier)).err().unwrap();
        assert!(matches!(err, LoadError::Incompatible { .. }));
    }

    #[test]
    fn test_batch_output_is_malformed() {
        struct TwoRows;

        impl Classifier for TwoRows {
            fn name(&self) -> &str {
                "two_rows"
            }

            fn predict(&self, _rows: &[Vec<f64>]) -> Result<Vec<i64>, InferenceError> {
                Ok(vec![0, 0])
            }

            fn predict_probabilities(
                &self,
                _rows: &[Vec<f64>],
            ) -> Result<Vec<[f64; 2]>, InferenceError> {
                Ok(vec![[1.0, 0.0]; 2])
            }
        }

        assert!(ModelGateway::new(Arc::new(TwoRows)).is_err());
    }

    #[test]
    fn test_single_pass_backend_runs_once_per_prediction() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        // Only answers through the combined call, like an ONNX session
        struct SinglePass {
            runs: AtomicUsize,
        }

        impl Classifier for SinglePass {
            fn name(&self) -> &str {
                "single_pass"
            }

            fn predict(&self, _rows: &[Vec<f64>]) -> Result<Vec<i64>, InferenceError> {
                Err(InferenceError::Scoring("use the combined call".to_string()))
            }

            fn predict_probabilities(
                &self,
                _rows: &[Vec<f64>],
            ) -> Result<Vec<[f64; 2]>, InferenceError> {
                Err(InferenceError::Scoring("use the combined call".to_string()))
            }

            fn predict_with_probabilities(
                &self,
                rows: &[Vec<f64>],
            ) -> Result<(Vec<i64>, Vec<[f64; 2]>), InferenceError> {
                self.runs.fetch_add(1, Ordering::Relaxed);
                Ok((vec![1; rows.len()], vec![[0.3, 0.7]; rows.len()]))
            }
        }

        let model = Arc::new(SinglePass {
            runs: AtomicUsize::new(0),
        });
        let gateway = ModelGateway::new(model.clone()).unwrap();
        assert_eq!(model.runs.load(Ordering::Relaxed), 1);

        let result = gateway.predict(&FeatureVector::default()).unwrap();
        assert_eq!(result.label, Label::Fraud);
        assert_eq!(model.runs.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_end_to_end_label_matches_argmax() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(
            br#"{
                "model_type": "logistic_regression",
                "feature_names": ["V1", "V2", "V3", "V4", "V5", "Amount"],
                "coefficients": [-0.8, 0.6, -0.7, 0.9, -0.2, 0.0015],
                "intercept": -3.1
            }"#,
        )
        .unwrap();

        let gateway = ModelGateway::load_model(file.path()).unwrap();

        let vectors = [
            FeatureVector::default(),
            FeatureVector::new([-2.3, 1.5, -1.8, 3.2, -0.5, 2000.0]),
            FeatureVector::new([0.0, 0.1, -0.2, 0.3, 0.0, 50.0]),
            FeatureVector::new([5.0, -5.0, 5.0, -5.0, 5.0, 0.0]),
        ];

        for features in &vectors {
            let result = gateway.predict(features).unwrap();
            let [p0, p1] = result.probabilities;

            assert!(p0 >= 0.0 && p1 >= 0.0);
            assert!((p0 + p1 - 1.0).abs() < 1e-6);

            let argmax = if p1 > p0 { Label::Fraud } else { Label::NotFraud };
            assert_eq!(result.label, argmax);
        }
    }

    #[test]
    fn test_load_missing_artifact() {
        let err = ModelGateway::load_model("missing/fraud_detection_model.onnx")
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::NotFound(_)));
    }
}
