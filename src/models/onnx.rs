//! ONNX classifier backed by ONNX Runtime
//!
//! Handles the two output layouts scikit-learn style exporters produce for
//! binary classifiers: an `int64` label tensor alongside either a plain
//! `[batch, 2]` probability tensor or a `seq(map(int64, float))` ZipMap.

use crate::error::InferenceError;
use crate::models::classifier::Classifier;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Loaded ONNX session with resolved input/output names
pub struct OnnxClassifier {
    name: String,
    /// `Session::run` needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    label_output: String,
    probability_output: String,
}

impl OnnxClassifier {
    /// Build a session from an `.onnx` file
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self> {
        let path = path.as_ref();

        ort::init().commit()?;

        info!(path = %path.display(), threads = onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        let (label_output, probability_output) = resolve_output_names(&output_names);

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        info!(
            model = %name,
            input = %input_name,
            label_output = %label_output,
            probability_output = %probability_output,
            "ONNX model loaded"
        );

        Ok(Self {
            name,
            session: Mutex::new(session),
            input_name,
            label_output,
            probability_output,
        })
    }

    /// Run the session once and decode both outputs
    fn run(&self, rows: &[Vec<f64>]) -> Result<(Vec<i64>, Vec<[f64; 2]>), InferenceError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(InferenceError::InputWidth {
                expected: width,
                actual: bad.len(),
            });
        }

        let data: Vec<f32> = rows.iter().flatten().map(|&v| v as f32).collect();
        let shape = vec![rows.len() as i64, width as i64];
        let input_tensor = Tensor::from_array((shape, data))
            .map_err(|e| InferenceError::Scoring(format!("failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::Scoring(format!("lock error: {}", e)))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(|e| InferenceError::Scoring(e.to_string()))?;

        let labels = self.extract_labels(&outputs)?;
        let probabilities = self.extract_probabilities(&outputs)?;

        debug!(
            model = %self.name,
            rows = rows.len(),
            "ONNX inference complete"
        );

        Ok((labels, probabilities))
    }

    fn extract_labels(&self, outputs: &SessionOutputs) -> Result<Vec<i64>, InferenceError> {
        let output = outputs.get(self.label_output.as_str()).ok_or_else(|| {
            InferenceError::MalformedOutput(format!("missing output '{}'", self.label_output))
        })?;

        let (_, data) = output.try_extract_tensor::<i64>().map_err(|e| {
            InferenceError::MalformedOutput(format!(
                "output '{}' is not an int64 tensor: {}",
                self.label_output, e
            ))
        })?;

        Ok(data.to_vec())
    }

    fn extract_probabilities(
        &self,
        outputs: &SessionOutputs,
    ) -> Result<Vec<[f64; 2]>, InferenceError> {
        let output = outputs.get(self.probability_output.as_str()).ok_or_else(|| {
            InferenceError::MalformedOutput(format!(
                "missing output '{}'",
                self.probability_output
            ))
        })?;

        // Plain tensor (ZipMap disabled at export)
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            return probabilities_from_tensor(&dims, data);
        }

        // seq(map(int64, float)) (ZipMap enabled, the skl2onnx default)
        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return self.extract_from_sequence_map(output);
        }

        Err(InferenceError::MalformedOutput(format!(
            "output '{}' has unsupported type {:?}",
            self.probability_output, dtype
        )))
    }

    fn extract_from_sequence_map(
        &self,
        output: &DynValue,
    ) -> Result<Vec<[f64; 2]>, InferenceError> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| InferenceError::MalformedOutput(format!("not a sequence: {}", e)))?;

        let maps = sequence
            .try_extract_sequence::<DynMapValueType>(&allocator)
            .map_err(|e| InferenceError::MalformedOutput(e.to_string()))?;

        maps.iter()
            .map(|map_value| {
                let kv_pairs = map_value
                    .try_extract_key_values::<i64, f32>()
                    .map_err(|e| InferenceError::MalformedOutput(e.to_string()))?;
                probabilities_from_pairs(&kv_pairs)
            })
            .collect()
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>, InferenceError> {
        self.run(rows).map(|(labels, _)| labels)
    }

    fn predict_probabilities(&self, rows: &[Vec<f64>]) -> Result<Vec<[f64; 2]>, InferenceError> {
        self.run(rows).map(|(_, probabilities)| probabilities)
    }

    /// One session run yields both outputs
    fn predict_with_probabilities(
        &self,
        rows: &[Vec<f64>],
    ) -> Result<(Vec<i64>, Vec<[f64; 2]>), InferenceError> {
        self.run(rows)
    }
}

/// Pick the label and probability outputs from the graph's output names.
///
/// The label is the first name containing "label", else the first output.
/// The probability output is searched among the remaining names, skipping
/// anything that looks like a label, so `output_label` is never mistaken
/// for `output_probability`.
fn resolve_output_names(names: &[&str]) -> (String, String) {
    let label_output = names
        .iter()
        .find(|n| n.contains("label"))
        .or_else(|| names.first())
        .map(|n| n.to_string())
        .unwrap_or_else(|| "label".to_string());

    let candidates: Vec<&str> = names
        .iter()
        .copied()
        .filter(|n| *n != label_output && !n.contains("label"))
        .collect();

    let probability_output = candidates
        .iter()
        .find(|n| n.contains("prob"))
        .or_else(|| candidates.iter().find(|n| n.contains("output")))
        .or_else(|| candidates.last())
        .map(|n| n.to_string())
        .unwrap_or_else(|| "probabilities".to_string());

    (label_output, probability_output)
}

/// Split a `[batch, 2]` tensor into per-row pairs
fn probabilities_from_tensor(dims: &[i64], data: &[f32]) -> Result<Vec<[f64; 2]>, InferenceError> {
    match dims {
        [_, 2] | [2] => Ok(data
            .chunks_exact(2)
            .map(|pair| [pair[0] as f64, pair[1] as f64])
            .collect()),
        _ => Err(InferenceError::MalformedOutput(format!(
            "expected probability shape [batch, 2], got {:?}",
            dims
        ))),
    }
}

/// Order a `{class_id: probability}` map by class id
fn probabilities_from_pairs(kv_pairs: &[(i64, f32)]) -> Result<[f64; 2], InferenceError> {
    let mut probabilities = [None, None];

    for &(class_id, prob) in kv_pairs {
        match class_id {
            0 | 1 => probabilities[class_id as usize] = Some(prob as f64),
            other => return Err(InferenceError::UnknownLabel(other)),
        }
    }

    match probabilities {
        [Some(p0), Some(p1)] => Ok([p0, p1]),
        [Some(p0), None] => Ok([p0, 1.0 - p0]),
        [None, Some(p1)] => Ok([1.0 - p1, p1]),
        [None, None] => Err(InferenceError::MalformedOutput(
            "empty probability map".to_string(),
        )),
    }
}
