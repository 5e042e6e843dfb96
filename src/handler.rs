//! Prediction request handling
//!
//! Turns a user's form into a feature vector, hands it to the model
//! gateway, and maps the result to a verdict. Errors from the gateway stop
//! here: they are logged, counted and returned to the caller, and the form
//! itself is only ever borrowed immutably while scoring.

use crate::error::InferenceError;
use crate::metrics::PredictionMetrics;
use crate::models::gateway::ModelGateway;
use crate::render::{FRAUD_HEADLINE, LEGITIMATE_HEADLINE};
use crate::types::features::FeatureVector;
use crate::types::prediction::{Label, PredictionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Named input slot on the form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    V1,
    V2,
    V3,
    V4,
    V5,
    Amount,
}

impl Field {
    /// Every field in model input order
    pub const ALL: [Field; 6] = [
        Field::V1,
        Field::V2,
        Field::V3,
        Field::V4,
        Field::V5,
        Field::Amount,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::V1 => "v1",
            Field::V2 => "v2",
            Field::V3 => "v3",
            Field::V4 => "v4",
            Field::V5 => "v5",
            Field::Amount => "amount",
        }
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown field '{}'", s))
    }
}

/// Per-user form values. Unset slots read as `0.0`.
///
/// Unknown keys are rejected so a misspelled field is never silently scored
/// as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormState {
    #[serde(default)]
    pub v1: Option<f64>,
    #[serde(default)]
    pub v2: Option<f64>,
    #[serde(default)]
    pub v3: Option<f64>,
    #[serde(default)]
    pub v4: Option<f64>,
    #[serde(default)]
    pub v5: Option<f64>,
    #[serde(default)]
    pub amount: Option<f64>,
}

impl FormState {
    fn slot(&self, field: Field) -> Option<f64> {
        match field {
            Field::V1 => self.v1,
            Field::V2 => self.v2,
            Field::V3 => self.v3,
            Field::V4 => self.v4,
            Field::V5 => self.v5,
            Field::Amount => self.amount,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<f64> {
        match field {
            Field::V1 => &mut self.v1,
            Field::V2 => &mut self.v2,
            Field::V3 => &mut self.v3,
            Field::V4 => &mut self.v4,
            Field::V5 => &mut self.v5,
            Field::Amount => &mut self.amount,
        }
    }

    /// Current value of `field`, `0.0` when unset
    pub fn get(&self, field: Field) -> f64 {
        self.slot(field).unwrap_or(0.0)
    }

    pub fn set(&mut self, field: Field, value: f64) {
        *self.slot_mut(field) = Some(value);
    }

    /// Copy every slot that is set in `update`, leaving the rest alone
    pub fn merge(&mut self, update: &FormState) {
        for field in Field::ALL {
            if let Some(value) = update.slot(field) {
                self.set(field, value);
            }
        }
    }

    /// Overwrite every slot from a feature vector
    pub fn fill(&mut self, features: &FeatureVector) {
        for (field, &value) in Field::ALL.iter().zip(features.values()) {
            self.set(*field, value);
        }
    }
}

/// Read the form into a feature vector in model order
pub fn collect_inputs(state: &FormState) -> FeatureVector {
    let mut values = [0.0; 6];
    for (slot, field) in values.iter_mut().zip(Field::ALL) {
        *slot = state.get(field);
    }
    FeatureVector::new(values)
}

/// One-click demonstration inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    FraudSample,
    NormalSample,
    ClearedSample,
}

impl Preset {
    pub const ALL: [Preset; 3] = [
        Preset::FraudSample,
        Preset::NormalSample,
        Preset::ClearedSample,
    ];

    /// Literal feature values for this preset
    pub const fn features(self) -> FeatureVector {
        match self {
            Preset::FraudSample => FeatureVector::new([-2.3, 1.5, -1.8, 3.2, -0.5, 2000.0]),
            Preset::NormalSample => FeatureVector::new([0.0, 0.1, -0.2, 0.3, 0.0, 50.0]),
            Preset::ClearedSample => FeatureVector::new([0.0; 6]),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Preset::FraudSample => "fraud_sample",
            Preset::NormalSample => "normal_sample",
            Preset::ClearedSample => "cleared_sample",
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "fraud" | "fraudsample" => Ok(Preset::FraudSample),
            "normal" | "normalsample" => Ok(Preset::NormalSample),
            "clear" | "cleared" | "clearedsample" | "reset" => Ok(Preset::ClearedSample),
            _ => Err(format!("unknown preset '{}'", s)),
        }
    }
}

/// Overwrite the form with a preset and return the resulting vector
pub fn apply_preset(state: &mut FormState, preset: Preset) -> FeatureVector {
    let features = preset.features();
    state.fill(&features);
    features
}

/// User-facing classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    NotFraud,
    Fraud,
}

impl From<Label> for VerdictKind {
    fn from(label: Label) -> Self {
        match label {
            Label::Fraud => VerdictKind::Fraud,
            Label::NotFraud => VerdictKind::NotFraud,
        }
    }
}

/// How prominently a verdict should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Alert,
    Success,
}

/// Verdict plus display-rounded probabilities
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    pub kind: VerdictKind,
    /// `[p(NotFraud), p(Fraud)]`, rounded to 4 decimals
    pub probabilities: [f64; 2],
}

impl Verdict {
    pub fn headline(&self) -> &'static str {
        match self.kind {
            VerdictKind::Fraud => FRAUD_HEADLINE,
            VerdictKind::NotFraud => LEGITIMATE_HEADLINE,
        }
    }

    pub fn severity(&self) -> Severity {
        match self.kind {
            VerdictKind::Fraud => Severity::Alert,
            VerdictKind::NotFraud => Severity::Success,
        }
    }

    pub fn probability(&self, label: Label) -> f64 {
        self.probabilities[label.index()]
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.headline())
    }
}

fn round4(p: f64) -> f64 {
    (p * 10_000.0).round() / 10_000.0
}

/// Map a prediction to its verdict
pub fn interpret(result: &PredictionResult) -> Verdict {
    Verdict {
        kind: result.label.into(),
        probabilities: [round4(result.probabilities[0]), round4(result.probabilities[1])],
    }
}

/// Request boundary between user input and the model gateway
#[derive(Clone)]
pub struct PredictionHandler {
    gateway: Arc<ModelGateway>,
    metrics: Arc<PredictionMetrics>,
    allow_negative_amount: bool,
}

impl PredictionHandler {
    pub fn new(gateway: Arc<ModelGateway>, metrics: Arc<PredictionMetrics>) -> Self {
        Self {
            gateway,
            metrics,
            allow_negative_amount: false,
        }
    }

    /// Accept transactions with a negative amount
    pub fn allow_negative_amount(mut self, allow: bool) -> Self {
        self.allow_negative_amount = allow;
        self
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    pub fn metrics(&self) -> &PredictionMetrics {
        &self.metrics
    }

    /// Score the current form
    pub fn submit(&self, state: &FormState) -> Result<Verdict, InferenceError> {
        self.submit_features(&collect_inputs(state))
    }

    /// Validate and score a feature vector
    pub fn submit_features(&self, features: &FeatureVector) -> Result<Verdict, InferenceError> {
        let start_time = Instant::now();

        let result = features
            .validate(self.allow_negative_amount)
            .and_then(|()| self.gateway.predict(features));

        match result {
            Ok(prediction) => {
                let processing_time = start_time.elapsed();
                self.metrics
                    .record_prediction(processing_time, prediction.label);

                let verdict = interpret(&prediction);
                info!(
                    verdict = ?verdict.kind,
                    p_fraud = verdict.probability(Label::Fraud),
                    amount = features.amount(),
                    processing_time_us = processing_time.as_micros(),
                    "Prediction served"
                );
                Ok(verdict)
            }
            Err(e) => {
                self.metrics.record_failure();
                warn!(
                    error = %e,
                    features = ?features.values(),
                    "Prediction failed"
                );
                Err(e)
            }
        }
    }
}
