//! API request handlers

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use super::sessions::SessionStore;
use super::types::*;
use crate::error::InferenceError;
use crate::handler::{apply_preset, collect_inputs, FormState, PredictionHandler, Preset, Verdict};
use crate::types::features::FeatureVector;

/// Shared application state
pub struct AppState {
    pub handler: PredictionHandler,
    pub sessions: SessionStore,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(handler: PredictionHandler) -> Self {
        Self {
            handler,
            sessions: SessionStore::new(),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

type ApiFailure = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiFailure>;

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn ok<T: serde::Serialize>(data: T, start: Instant) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

fn fail(status: StatusCode, error: ApiError, start: Instant) -> ApiFailure {
    (status, Json(ApiResponse::error(error, elapsed_ms(start))))
}

fn session_not_found(id: &Uuid, start: Instant) -> ApiFailure {
    fail(
        StatusCode::NOT_FOUND,
        ApiError::not_found(format!("Session {} not found", id)),
        start,
    )
}

/// Score on the blocking pool so a slow model never stalls the reactor
async fn score(
    state: &AppState,
    features: FeatureVector,
    start: Instant,
) -> Result<Verdict, ApiFailure> {
    let handler = state.handler.clone();

    let result = tokio::task::spawn_blocking(move || handler.submit_features(&features))
        .await
        .map_err(|e| {
            error!(error = %e, "Prediction task panicked");
            fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal("Prediction task failed"),
                start,
            )
        })?;

    result.map_err(|e: InferenceError| {
        fail(
            StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::prediction_failed(e.to_string()),
            start,
        )
    })
}

// ============================================
// Health & Status
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        model: state.handler.gateway().model_name().to_string(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();

    let data = StatsData {
        active_sessions: state.sessions.len(),
        metrics: state.handler.metrics().snapshot(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Stateless scoring
// ============================================

pub async fn list_presets() -> Json<ApiResponse<Vec<PresetData>>> {
    let start = Instant::now();
    let presets: Vec<PresetData> = Preset::ALL.into_iter().map(PresetData::from).collect();
    Json(ApiResponse::success(presets, elapsed_ms(start)))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictRequest>,
) -> ApiResult<VerdictData> {
    let start = Instant::now();

    let features = match req {
        PredictRequest::Row(row) => {
            FeatureVector::try_from(row.features.as_slice()).map_err(|e| {
                fail(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ApiError::prediction_failed(e.to_string()),
                    start,
                )
            })?
        }
        PredictRequest::Form(form) => collect_inputs(&form),
    };

    let verdict = score(&state, features, start).await?;
    ok(VerdictData::new(&verdict, features), start)
}

// ============================================
// Session-scoped form
// ============================================

pub async fn create_session(State(state): State<Arc<AppState>>) -> ApiResult<SessionData> {
    let start = Instant::now();

    let session_id = state.sessions.create();
    info!(session_id = %session_id, "Session created");

    ok(
        SessionData {
            session_id,
            form: FormValues::from(&FormState::default()),
        },
        start,
    )
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<SessionData> {
    let start = Instant::now();

    let form = state
        .sessions
        .get(&id)
        .ok_or_else(|| session_not_found(&id, start))?;

    ok(
        SessionData {
            session_id: id,
            form: FormValues::from(&form),
        },
        start,
    )
}

pub async fn update_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<FormState>,
) -> ApiResult<SessionData> {
    let start = Instant::now();

    let form = state
        .sessions
        .update(&id, |form| form.merge(&update))
        .ok_or_else(|| session_not_found(&id, start))?;

    ok(
        SessionData {
            session_id: id,
            form: FormValues::from(&form),
        },
        start,
    )
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DeletedData> {
    let start = Instant::now();

    if !state.sessions.remove(&id) {
        return Err(session_not_found(&id, start));
    }
    info!(session_id = %id, "Session deleted");

    ok(
        DeletedData {
            session_id: id,
            deleted: true,
        },
        start,
    )
}

pub async fn apply_session_preset(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(Uuid, String)>,
) -> ApiResult<SessionData> {
    let start = Instant::now();

    let preset = name
        .parse::<Preset>()
        .map_err(|e: String| fail(StatusCode::BAD_REQUEST, ApiError::bad_request(e), start))?;

    set_preset(&state, id, preset, start)
}

pub async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<SessionData> {
    let start = Instant::now();
    set_preset(&state, id, Preset::ClearedSample, start)
}

fn set_preset(state: &AppState, id: Uuid, preset: Preset, start: Instant) -> ApiResult<SessionData> {
    let form = state
        .sessions
        .update(&id, |form| {
            apply_preset(form, preset);
        })
        .ok_or_else(|| session_not_found(&id, start))?;

    info!(session_id = %id, preset = preset.name(), "Preset applied");

    ok(
        SessionData {
            session_id: id,
            form: FormValues::from(&form),
        },
        start,
    )
}

pub async fn predict_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<VerdictData> {
    let start = Instant::now();

    // Score a copy; the stored form is never touched by a prediction
    let form = state
        .sessions
        .get(&id)
        .ok_or_else(|| session_not_found(&id, start))?;
    let features = collect_inputs(&form);

    let verdict = score(&state, features, start).await?;
    ok(VerdictData::new(&verdict, features), start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::create_router;
    use crate::metrics::PredictionMetrics;
    use crate::models::classifier::testing::AmountThresholdClassifier;
    use crate::models::gateway::ModelGateway;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let gateway =
            ModelGateway::new(Arc::new(AmountThresholdClassifier { threshold: 1000.0 })).unwrap();
        let handler = PredictionHandler::new(Arc::new(gateway), Arc::new(PredictionMetrics::new()));
        create_router(Arc::new(AppState::new(handler)))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = send(app, "POST", "/sessions", None).await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "healthy");
        assert_eq!(body["data"]["model"], "amount_threshold");
    }

    #[tokio::test]
    async fn test_presets_listed() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/presets", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["name"], "fraud_sample");
        assert_eq!(body["data"][0]["features"], json!([-2.3, 1.5, -1.8, 3.2, -0.5, 2000.0]));
        assert_eq!(body["data"][2]["features"], json!([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
    }

    #[tokio::test]
    async fn test_session_flow() {
        let app = test_app();
        let id = new_session(&app).await;

        let (_, body) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
        assert_eq!(body["data"]["form"]["amount"], 0.0);

        let (status, _) = send(&app, "POST", &format!("/sessions/{}/presets/fraud", id), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "POST", &format!("/sessions/{}/predict", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["verdict"], "fraud");
        assert_eq!(body["data"]["headline"], "FRAUD DETECTED");
        assert_eq!(body["data"]["severity"], "alert");
        assert_eq!(body["data"]["summary"], "Not Fraud: 0.1000 | Fraud: 0.9000");

        let (_, body) = send(&app, "POST", &format!("/sessions/{}/clear", id), None).await;
        assert_eq!(body["data"]["form"]["amount"], 0.0);
        assert_eq!(body["data"]["form"]["v1"], 0.0);

        let (_, body) = send(&app, "POST", &format!("/sessions/{}/predict", id), None).await;
        assert_eq!(body["data"]["verdict"], "not_fraud");
        assert_eq!(body["data"]["headline"], "LEGITIMATE TRANSACTION");
    }

    #[tokio::test]
    async fn test_failed_prediction_keeps_form() {
        let app = test_app();
        let id = new_session(&app).await;

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/sessions/{}", id),
            Some(json!({"v1": 1.25, "amount": -5.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "POST", &format!("/sessions/{}/predict", id), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "PREDICTION_FAILED");

        let (_, body) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
        assert_eq!(body["data"]["form"]["v1"], 1.25);
        assert_eq!(body["data"]["form"]["amount"], -5.0);

        let (_, body) = send(&app, "GET", "/stats", None).await;
        assert_eq!(body["data"]["failures"], 1);
        assert_eq!(body["data"]["active_sessions"], 1);
    }

    #[tokio::test]
    async fn test_unknown_session_and_preset() {
        let app = test_app();
        let missing = Uuid::new_v4();

        let (status, _) = send(&app, "POST", &format!("/sessions/{}/predict", missing), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let id = new_session(&app).await;
        let (status, body) =
            send(&app, "POST", &format!("/sessions/{}/presets/suspicious", id), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        let (status, _) = send(&app, "DELETE", &format!("/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stateless_predict() {
        let app = test_app();

        let (status, body) = send(
            &app,
            "POST",
            "/predict",
            Some(json!({"features": [0.0, 0.1, -0.2, 0.3, 0.0, 50.0]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["verdict"], "not_fraud");
        assert_eq!(body["data"]["probabilities"]["not_fraud"], 0.9);

        let (status, body) = send(&app, "POST", "/predict", Some(json!({"amount": 2500.0}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["verdict"], "fraud");

        let (status, body) = send(
            &app,
            "POST",
            "/predict",
            Some(json!({"features": [1.0, 2.0, 3.0, 4.0, 5.0]})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["message"], "expected 6 input values, got 5");
    }

    #[tokio::test]
    async fn test_predict_rejects_unknown_keys() {
        let app = test_app();

        // Wrong case must not fall back to an all-zero form
        let (status, _) = send(
            &app,
            "POST",
            "/predict",
            Some(json!({"V1": -2.3, "Amount": 2000.0})),
        )
        .await;
        assert!(status.is_client_error());

        let (status, _) = send(
            &app,
            "POST",
            "/predict",
            Some(json!({"features": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0], "label": 1})),
        )
        .await;
        assert!(status.is_client_error());

        let (_, body) = send(&app, "GET", "/stats", None).await;
        assert_eq!(body["data"]["predictions"], 0);
    }

    #[tokio::test]
    async fn test_update_session_rejects_unknown_keys() {
        let app = test_app();
        let id = new_session(&app).await;

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/sessions/{}", id),
            Some(json!({"v1": 3.0, "amuont": 20.0})),
        )
        .await;
        assert!(status.is_client_error());

        let (_, body) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
        assert_eq!(body["data"]["form"]["v1"], 0.0);
        assert_eq!(body["data"]["form"]["amount"], 0.0);
    }
}
