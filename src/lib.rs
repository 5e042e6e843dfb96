//! FraudGuard
//!
//! Single-transaction fraud verdicts over a pre-fitted binary classifier.
//! Six numeric inputs go in, a verdict and both class probabilities come out.

pub mod api;
pub mod config;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod models;
pub mod render;
pub mod types;

pub use config::AppConfig;
pub use error::{InferenceError, LoadError};
pub use handler::{
    apply_preset, collect_inputs, interpret, FormState, PredictionHandler, Preset, Verdict,
};
pub use metrics::PredictionMetrics;
pub use models::gateway::ModelGateway;
pub use types::{features::FeatureVector, prediction::PredictionResult};
