//! Model artifact loader

use crate::error::LoadError;
use crate::models::classifier::ClassifierHandle;
use crate::models::linear::LogisticModel;
use crate::models::onnx::OnnxClassifier;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Reads a classifier artifact from disk, picking the backend by extension
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load the artifact at `path`
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<ClassifierHandle, LoadError> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let handle: ClassifierHandle = match extension.as_str() {
            "onnx" => {
                let model = OnnxClassifier::load(path, self.onnx_threads).map_err(|e| {
                    LoadError::Corrupt {
                        path: path.to_path_buf(),
                        reason: format!("{:#}", e),
                    }
                })?;
                Arc::new(model)
            }
            "json" => {
                let bytes = std::fs::read(path).map_err(|e| LoadError::Corrupt {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
                let model = LogisticModel::from_json(&bytes).map_err(|reason| {
                    LoadError::Corrupt {
                        path: path.to_path_buf(),
                        reason,
                    }
                })?;
                Arc::new(model)
            }
            _ => {
                return Err(LoadError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    extension,
                })
            }
        };

        info!(
            model = %handle.name(),
            path = %path.display(),
            "Model artifact loaded"
        );

        Ok(handle)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
