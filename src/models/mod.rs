//! Model gateway and classifier backends

pub mod classifier;
pub mod gateway;
pub mod linear;
pub mod loader;
pub mod onnx;

pub use classifier::{Classifier, ClassifierHandle};
pub use gateway::ModelGateway;
pub use linear::LogisticModel;
pub use loader::ModelLoader;
pub use onnx::OnnxClassifier;
