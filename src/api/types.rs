//! API request/response types

use crate::handler::{collect_inputs, FormState, Preset, Severity, Verdict, VerdictKind};
use crate::metrics::MetricsSnapshot;
use crate::render::{bar_chart, summary_line, DEFAULT_BAR_WIDTH};
use crate::types::features::FeatureVector;
use crate::types::prediction::Label;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: "NOT_FOUND".to_string(),
            message: message.into(),
        }
    }

    pub fn prediction_failed(message: impl Into<String>) -> Self {
        Self {
            code: "PREDICTION_FAILED".to_string(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
        }
    }
}

/// Body of `POST /predict`: either a raw row or named fields
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PredictRequest {
    Row(FeatureRow),
    Form(FormState),
}

/// `{"features": [v1, v2, v3, v4, v5, amount]}`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureRow {
    pub features: Vec<f64>,
}

/// Both class probabilities, 4 decimals
#[derive(Debug, Serialize)]
pub struct ProbabilityData {
    pub not_fraud: f64,
    pub fraud: f64,
}

/// Rendered verdict
#[derive(Debug, Serialize)]
pub struct VerdictData {
    pub verdict: VerdictKind,
    pub headline: String,
    pub severity: Severity,
    pub probabilities: ProbabilityData,
    pub summary: String,
    pub chart: String,
    pub features: FeatureVector,
}

impl VerdictData {
    pub fn new(verdict: &Verdict, features: FeatureVector) -> Self {
        Self {
            verdict: verdict.kind,
            headline: verdict.headline().to_string(),
            severity: verdict.severity(),
            probabilities: ProbabilityData {
                not_fraud: verdict.probability(Label::NotFraud),
                fraud: verdict.probability(Label::Fraud),
            },
            summary: summary_line(verdict),
            chart: bar_chart(verdict, DEFAULT_BAR_WIDTH),
            features,
        }
    }
}

/// Form values as the user sees them (unset slots shown as 0.0)
#[derive(Debug, Serialize)]
pub struct FormValues {
    pub v1: f64,
    pub v2: f64,
    pub v3: f64,
    pub v4: f64,
    pub v5: f64,
    pub amount: f64,
}

impl From<&FormState> for FormValues {
    fn from(state: &FormState) -> Self {
        let [v1, v2, v3, v4, v5, amount] = *collect_inputs(state).values();
        Self {
            v1,
            v2,
            v3,
            v4,
            v5,
            amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionData {
    pub session_id: Uuid,
    pub form: FormValues,
}

#[derive(Debug, Serialize)]
pub struct DeletedData {
    pub session_id: Uuid,
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct PresetData {
    pub name: &'static str,
    pub features: FeatureVector,
}

impl From<Preset> for PresetData {
    fn from(preset: Preset) -> Self {
        Self {
            name: preset.name(),
            features: preset.features(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub active_sessions: usize,
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
}
