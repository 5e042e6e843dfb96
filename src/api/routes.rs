//! API route configuration

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{self, AppState};

/// Create the API router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & status
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        // Stateless scoring
        .route("/presets", get(handlers::list_presets))
        .route("/predict", post(handlers::predict))
        // Session-scoped form
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/:id",
            get(handlers::get_session)
                .patch(handlers::update_session)
                .delete(handlers::delete_session),
        )
        .route("/sessions/:id/presets/:name", post(handlers::apply_session_preset))
        .route("/sessions/:id/clear", post(handlers::clear_session))
        .route("/sessions/:id/predict", post(handlers::predict_session))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
