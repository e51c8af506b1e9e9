//! HTTP API for health status, healing statistics, and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use healer_lib::HealingEngine;
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<HealingEngine>,
}

impl AppState {
    pub fn new(engine: Arc<HealingEngine>) -> Self {
        Self { engine }
    }
}

/// Current health snapshot
async fn health_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.engine.current_health().await;
    Json(health)
}

/// Healing attempt counters
async fn statistics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.engine.healing_statistics().await;
    Json(stats)
}

/// Snapshot, prediction, and statistics in one response
async fn detailed(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.engine.current_health().await;
    let prediction = state.engine.current_prediction().await;
    let stats = state.engine.healing_statistics().await;

    Json(json!({
        "health": health,
        "prediction": prediction,
        "healing_stats": stats,
    }))
}

/// Run one monitoring cycle on demand
async fn trigger_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.engine.trigger_check().await;
    let stats = state.engine.healing_statistics().await;
    Json(json!({
        "status": "check completed",
        "healing_stats": stats,
    }))
}

/// Liveness: 200 while the system is not failing, 503 otherwise
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.engine.current_health().await;
    let status_code = if health.overall_status.is_failing() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status_code, Json(json!({ "status": health.overall_status })))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health/status", get(health_status))
        .route("/api/v1/health/statistics", get(statistics))
        .route("/api/v1/health/detailed", get(detailed))
        .route("/api/v1/health/trigger-check", post(trigger_check))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
