//! Type definitions shared by the gateway, handler and API

pub mod features;
pub mod prediction;

pub use features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use prediction::{Label, PredictionResult};
