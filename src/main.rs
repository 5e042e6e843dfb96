//! FraudGuard HTTP server
//!
//! Loads the classifier once, then serves verdicts over HTTP until Ctrl+C.
//!
//! Environment:
//!   FRAUDGUARD__MODEL__PATH - model artifact (default: models/fraud_detection_model.onnx,
//!     config/config.toml ships pointing at models/logistic_demo.json)
//!   FRAUDGUARD__SERVER__PORT - server port (default: 8080)
//!   RUST_LOG - log filter (overrides logging.level)

use anyhow::{Context, Result};
use fraudguard::{
    api::{create_router, AppState},
    config::{AppConfig, LoggingConfig},
    metrics::PredictionMetrics,
    models::gateway::ModelGateway,
    handler::PredictionHandler,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("fraudguard={},tower_http=info", logging.level)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting FraudGuard");
    info!(
        model_path = %config.model.path,
        allow_negative_amount = config.validation.allow_negative_amount,
        "Configuration loaded"
    );

    // The model is loaded exactly once; nothing is served without it
    let gateway = match ModelGateway::from_config(&config.model) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            error!(error = %e, "Model could not be loaded");
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let metrics = Arc::new(PredictionMetrics::new());
    let handler = PredictionHandler::new(gateway, metrics.clone())
        .allow_negative_amount(config.validation.allow_negative_amount);

    let state = Arc::new(AppState::new(handler));

    // Background task: drop idle form sessions
    let sweeper = state.clone();
    let ttl = Duration::from_secs(config.server.session_ttl_secs);
    let every = Duration::from_secs(config.server.session_cleanup_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = sweeper.sessions.cleanup_expired(ttl);
            if removed > 0 {
                info!(removed, "Expired form sessions removed");
            }
        }
    });

    let app = create_router(state);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .context("Invalid server address")?;
    let listener = TcpListener::bind(addr).await?;

    info!("FraudGuard listening on http://{}", addr);
    info!("  POST /predict                    - Score six features");
    info!("  POST /sessions                   - Start a form session");
    info!("  POST /sessions/:id/presets/:name - fraud | normal | clear");
    info!("  POST /sessions/:id/predict       - Score the session form");
    info!("  GET  /health, /stats, /presets");

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Shutdown signal received");
    metrics.print_summary();

    Ok(())
}
