//! Observability infrastructure for the healing agent
//!
//! Prometheus metrics for health snapshots, healing outcomes, and
//! predictions. Structured JSON logging is configured by the binary.

use crate::models::{IssueType, Prediction, RiskCategory, SystemHealth};
use crate::sink::{MetricsSink, ProactiveOutcome};
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec, Gauge,
    Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;

/// Histogram buckets for health-check duration (in seconds)
const CHECK_DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<HealerMetricsInner> = OnceLock::new();

struct HealerMetricsInner {
    cpu_usage: Gauge,
    memory_usage: Gauge,
    disk_usage: Gauge,
    error_rate: Gauge,
    response_time_ms: Gauge,
    system_healthy: Gauge,
    prediction_confidence: Gauge,
    health_checks: IntCounter,
    check_duration_seconds: Histogram,
    healing_outcomes: IntCounterVec,
    proactive_actions: IntCounterVec,
    proactive_confidence: Gauge,
    cycle_errors: IntCounter,
}

impl HealerMetricsInner {
    fn new() -> Self {
        Self {
            cpu_usage: register_gauge!(
                "healer_cpu_usage_ratio",
                "Process CPU load as a fraction of total capacity"
            )
            .expect("Failed to register cpu_usage_ratio"),

            memory_usage: register_gauge!(
                "healer_memory_usage_ratio",
                "Heap usage as a fraction of the maximum"
            )
            .expect("Failed to register memory_usage_ratio"),

            disk_usage: register_gauge!(
                "healer_disk_usage_ratio",
                "Filesystem usage as a fraction of capacity"
            )
            .expect("Failed to register disk_usage_ratio"),

            error_rate: register_gauge!(
                "healer_error_rate_ratio",
                "Failed requests as a fraction of total requests"
            )
            .expect("Failed to register error_rate_ratio"),

            response_time_ms: register_gauge!(
                "healer_response_time_milliseconds",
                "Average request response time"
            )
            .expect("Failed to register response_time_milliseconds"),

            system_healthy: register_gauge!(
                "healer_system_healthy",
                "1 when the overall status is healthy, 0 otherwise"
            )
            .expect("Failed to register system_healthy"),

            prediction_confidence: register_gauge!(
                "healer_prediction_confidence",
                "Confidence of the most recent failure prediction"
            )
            .expect("Failed to register prediction_confidence"),

            health_checks: register_int_counter!(
                "healer_health_checks_total",
                "Total number of health snapshots taken"
            )
            .expect("Failed to register health_checks_total"),

            check_duration_seconds: register_histogram!(
                "healer_check_duration_seconds",
                "Time spent sampling one health snapshot",
                CHECK_DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register check_duration_seconds"),

            healing_outcomes: register_int_counter_vec!(
                "healer_healing_attempts_total",
                "Healing attempts by issue type and outcome",
                &["issue_type", "outcome"]
            )
            .expect("Failed to register healing_attempts_total"),

            proactive_actions: register_int_counter_vec!(
                "healer_proactive_actions_total",
                "Proactive mitigations by risk factor and outcome",
                &["risk_factor", "outcome"]
            )
            .expect("Failed to register proactive_actions_total"),

            proactive_confidence: register_gauge!(
                "healer_proactive_confidence",
                "Confidence of the prediction behind the latest proactive action"
            )
            .expect("Failed to register proactive_confidence"),

            cycle_errors: register_int_counter!(
                "healer_cycle_errors_total",
                "Monitoring cycles that failed before completing"
            )
            .expect("Failed to register cycle_errors_total"),
        }
    }
}

/// Healing-agent metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct HealerMetrics {
    _private: (),
}

impl Default for HealerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HealerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(HealerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &HealerMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_check_duration(&self, duration_secs: f64) {
        self.inner().check_duration_seconds.observe(duration_secs);
    }
}

impl MetricsSink for HealerMetrics {
    fn record_check_duration(&self, duration_secs: f64) {
        self.observe_check_duration(duration_secs);
    }

    fn record_snapshot(&self, health: &SystemHealth) {
        let inner = self.inner();
        inner.health_checks.inc();
        inner.cpu_usage.set(health.cpu_usage);
        inner.disk_usage.set(health.disk_usage);
        inner
            .system_healthy
            .set(if health.is_healthy() { 1.0 } else { 0.0 });
        if let Some(memory) = &health.memory {
            inner.memory_usage.set(memory.memory_usage);
        }
        if let Some(response) = &health.response_time {
            inner.error_rate.set(response.error_rate);
            inner
                .response_time_ms
                .set(response.average_response_time_ms);
        }
    }

    fn record_healing_outcome(&self, issue_type: IssueType, success: bool, reason: &str) {
        let outcome = if success { "success" } else { reason };
        self.inner()
            .healing_outcomes
            .with_label_values(&[issue_type.as_str(), outcome])
            .inc();
    }

    fn record_prediction(&self, prediction: &Prediction) {
        self.inner().prediction_confidence.set(prediction.confidence);
    }

    fn record_proactive(&self, category: RiskCategory, outcome: ProactiveOutcome, confidence: f64) {
        let inner = self.inner();
        inner
            .proactive_actions
            .with_label_values(&[category.as_str(), outcome.as_str()])
            .inc();
        inner.proactive_confidence.set(confidence);
    }

    fn record_cycle_error(&self) {
        self.inner().cycle_errors.inc();
    }
}
