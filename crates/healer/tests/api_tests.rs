//! Integration tests for the healer API endpoints

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use healer_lib::control::{CacheControl, ControlResult, DatabaseControl, RuntimeControl};
use healer_lib::healing::{
    HealingDispatcher, HealingPolicy, MemoryHealingStrategy, ProactiveHealer, StrategyRegistry,
};
use healer_lib::monitor::{
    DatabaseStats, HealthMonitor, HealthProviders, ProbeReport, RequestStats, RuntimeStats,
    RuntimeStatsProvider, ServiceStatsProvider, StaticHealthProvider,
};
use healer_lib::{HealerMetrics, HealingEngine};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct FixedRuntime {
    stats: RuntimeStats,
}

#[async_trait]
impl RuntimeStatsProvider for FixedRuntime {
    async fn stats(&self) -> anyhow::Result<RuntimeStats> {
        Ok(self.stats.clone())
    }
}

struct IdleServiceStats;

impl ServiceStatsProvider for IdleServiceStats {
    fn database_stats(&self) -> DatabaseStats {
        DatabaseStats {
            active_connections: 2,
            max_connections: 20,
            ..Default::default()
        }
    }

    fn request_stats(&self) -> RequestStats {
        RequestStats {
            average_response_time_ms: 100.0,
            request_count: 500,
            error_count: 1,
            throughput: 25.0,
            ..Default::default()
        }
    }
}

struct FakeCache;

#[async_trait]
impl CacheControl for FakeCache {
    async fn clear_all(&self) -> ControlResult<u64> {
        Ok(0)
    }
}

struct FakeRuntimeControl;

#[async_trait]
impl RuntimeControl for FakeRuntimeControl {
    async fn request_gc(&self) -> ControlResult<()> {
        Ok(())
    }

    async fn heap_usage(&self) -> ControlResult<f64> {
        Ok(0.4)
    }

    async fn thread_count(&self) -> ControlResult<usize> {
        Ok(20)
    }
}

struct FakeDatabaseControl;

#[async_trait]
impl DatabaseControl for FakeDatabaseControl {
    async fn validate_connection(&self, _timeout: Duration) -> ControlResult<bool> {
        Ok(true)
    }

    async fn reset_pool(&self) -> ControlResult<()> {
        Ok(())
    }

    async fn optimize(&self) -> ControlResult<()> {
        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    engine: Arc<HealingEngine>,
}

async fn health_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.current_health().await)
}

async fn statistics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.healing_statistics().await)
}

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

async fn trigger_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.engine.trigger_check().await;
    let stats = state.engine.healing_statistics().await;
    Json(json!({
        "status": "check completed",
        "healing_stats": stats,
    }))
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.engine.current_health().await;
    let status_code = if health.overall_status.is_failing() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status_code, Json(json!({ "status": health.overall_status })))
}

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

fn create_test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health/status", get(health_status))
        .route("/api/v1/health/statistics", get(statistics))
        .route("/api/v1/health/detailed", get(detailed))
        .route("/api/v1/health/trigger-check", post(trigger_check))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

fn test_engine(database_up: bool) -> Arc<HealingEngine> {
    let database_report = if database_up {
        ProbeReport::up()
    } else {
        ProbeReport::down("connection refused")
    };
    let providers = HealthProviders {
        database: Arc::new(StaticHealthProvider::new("database", database_report)),
        cache: Arc::new(StaticHealthProvider::new("cache", ProbeReport::up())),
        external_api: Arc::new(StaticHealthProvider::new("external_api", ProbeReport::up())),
        custom: Arc::new(StaticHealthProvider::new("custom", ProbeReport::up())),
    };
    let monitor = HealthMonitor::new(
        providers,
        Arc::new(FixedRuntime {
            stats: RuntimeStats {
                heap_used_bytes: 400,
                heap_max_bytes: 1000,
                process_cpu_load: 0.2,
                thread_count: 20,
                uptime_ms: 60_000,
                ..Default::default()
            },
        }),
        Arc::new(IdleServiceStats),
    );

    let cache: Arc<FakeCache> = Arc::new(FakeCache);
    let runtime: Arc<FakeRuntimeControl> = Arc::new(FakeRuntimeControl);
    let mut registry = StrategyRegistry::new();
    registry.register(Arc::new(
        MemoryHealingStrategy::new(cache.clone(), runtime.clone())
            .with_settle_delay(Duration::from_millis(0)),
    ));

    let metrics = Arc::new(HealerMetrics::new());
    let dispatcher = Arc::new(HealingDispatcher::with_policy(
        Arc::new(registry),
        metrics.clone(),
        HealingPolicy::default(),
    ));
    let proactive = Arc::new(ProactiveHealer::new(
        cache,
        runtime,
        Arc::new(FakeDatabaseControl),
        metrics.clone(),
    ));

    Arc::new(HealingEngine::new(monitor, dispatcher, proactive, metrics))
}

fn setup_test_app(database_up: bool) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        engine: test_engine(database_up),
    });
    let router = create_test_router(state.clone());
    (router, state)
}

#[tokio::test]
async fn test_health_status_reports_healthy_system() {
    let (app, _state) = setup_test_app(true);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(health["overall_status"], "HEALTHY");
    assert_eq!(health["database"]["status"], "HEALTHY");
    assert!(health["memory"]["memory_usage"].as_f64().unwrap() < 0.85);
}

#[tokio::test]
async fn test_healthz_returns_503_when_database_down() {
    let (app, _state) = setup_test_app(false);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let status: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status["status"], "CRITICAL");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app(true);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_statistics_start_empty() {
    let (app, _state) = setup_test_app(true);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health/statistics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(stats["total_attempts"], 0);
    assert_eq!(stats["active_issue_types"], 0);
}

#[tokio::test]
async fn test_detailed_combines_health_prediction_and_stats() {
    let (app, _state) = setup_test_app(true);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health/detailed")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let detailed: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(detailed["health"]["overall_status"], "HEALTHY");
    assert!(detailed["prediction"]["confidence"].as_f64().unwrap() < 0.5);
    assert!(detailed["prediction"]["risk_factors"]
        .as_array()
        .unwrap()
        .is_empty());
    assert_eq!(detailed["healing_stats"]["total_attempts"], 0);
}

#[tokio::test]
async fn test_trigger_check_records_a_cycle() {
    let (app, state) = setup_test_app(true);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/health/trigger-check")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let result: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(result["status"], "check completed");

    let stats = state.engine.healing_statistics().await;
    assert!(stats.last_check_time.is_some());
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, state) = setup_test_app(true);

    // One cycle populates the gauges
    state.engine.trigger_check().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("healer_health_checks_total"));
    assert!(metrics_text.contains("healer_memory_usage_ratio"));
    assert!(metrics_text.contains("healer_check_duration_seconds_bucket"));
    assert!(metrics_text.contains("healer_system_healthy"));
}
