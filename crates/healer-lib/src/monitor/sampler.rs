//! Per-cycle health sampling and aggregation
//!
//! The sampler queries every provider once, folds failures and timeouts
//! into degraded sub-healths, and produces one immutable snapshot. It
//! never errors; a dead collaborator degrades its slot, nothing more.

use super::{
    DatabaseStats, HealthProvider, ProbeReport, ProbeStatus, RequestStats, RuntimeStats,
    RuntimeStatsProvider, ServiceStatsProvider,
};
use crate::models::{
    DatabaseHealth, HealthStatus, MemoryHealth, ResponseTimeHealth, SystemHealth,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Default bound on every provider call
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The fixed capability set of health probes (§ external interfaces)
pub struct HealthProviders {
    pub database: Arc<dyn HealthProvider>,
    pub cache: Arc<dyn HealthProvider>,
    pub external_api: Arc<dyn HealthProvider>,
    pub custom: Arc<dyn HealthProvider>,
}

/// Samples all providers into one `SystemHealth` snapshot per cycle
pub struct HealthMonitor {
    providers: HealthProviders,
    runtime: Arc<dyn RuntimeStatsProvider>,
    service_stats: Arc<dyn ServiceStatsProvider>,
    probe_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(
        providers: HealthProviders,
        runtime: Arc<dyn RuntimeStatsProvider>,
        service_stats: Arc<dyn ServiceStatsProvider>,
    ) -> Self {
        Self {
            providers,
            runtime,
            service_stats,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Produce one snapshot; fail-soft, never errors
    pub async fn sample(&self) -> SystemHealth {
        let now = Utc::now();

        let (db_probe, cache_probe, api_probe, custom_probe) = tokio::join!(
            self.probe(self.providers.database.as_ref()),
            self.probe(self.providers.cache.as_ref()),
            self.probe(self.providers.external_api.as_ref()),
            self.probe(self.providers.custom.as_ref()),
        );

        let runtime = match tokio::time::timeout(self.probe_timeout, self.runtime.stats()).await
        {
            Ok(Ok(stats)) => Some(stats),
            Ok(Err(e)) => {
                warn!(error = %e, "Runtime statistics unavailable");
                None
            }
            Err(_) => {
                warn!("Runtime statistics provider timed out");
                None
            }
        };

        let db_stats = self.service_stats.database_stats();
        let request_stats = self.service_stats.request_stats();

        let database = build_database_health(&db_probe, &db_stats, now);
        let memory = build_memory_health(runtime.as_ref(), now);
        let response_time = build_response_health(&request_stats, now);

        let overall_status = SystemHealth::aggregate_status(&[
            database.status,
            memory.status,
            response_time.status,
        ]);

        let cpu_usage = runtime
            .as_ref()
            .map(|r| r.process_cpu_load)
            .unwrap_or(0.0);
        let disk_usage = parse_fraction_detail(&custom_probe, "disk_usage");

        let custom_metrics =
            build_custom_metrics(runtime.as_ref(), &cache_probe, &api_probe, &custom_probe);

        SystemHealth {
            overall_status,
            timestamp: now,
            database: Some(database),
            memory: Some(memory),
            response_time: Some(response_time),
            cpu_usage,
            disk_usage,
            active_connections: db_stats.active_connections as u64,
            requests_per_second: request_stats.throughput,
            custom_metrics,
        }
    }

    async fn probe(&self, provider: &dyn HealthProvider) -> ProbeReport {
        match tokio::time::timeout(self.probe_timeout, provider.check()).await {
            Ok(report) => report,
            Err(_) => {
                warn!(provider = provider.name(), "Health probe timed out");
                ProbeReport::error("probe timed out")
            }
        }
    }
}

/// Map a tri-state probe onto the database sub-health
fn build_database_health(
    probe: &ProbeReport,
    stats: &DatabaseStats,
    now: DateTime<Utc>,
) -> DatabaseHealth {
    let status = match probe.status {
        ProbeStatus::Up => HealthStatus::Healthy,
        ProbeStatus::Down => HealthStatus::Down,
        ProbeStatus::Error => HealthStatus::Unknown,
    };

    DatabaseHealth {
        status,
        last_checked: now,
        active_connections: stats.active_connections,
        max_connections: stats.max_connections,
        connection_pool_usage: stats.pool_usage(),
        average_query_time_ms: stats.average_query_time_ms,
        slow_query_count: stats.slow_query_count,
        deadlock_count: stats.deadlock_count,
        connected: probe.status == ProbeStatus::Up,
        last_error: probe.details.get("error").cloned(),
    }
}

/// Memory status bands: usage > 0.9 or gc > 0.1 is Critical,
/// usage > 0.8 or gc > 0.05 is Warning
fn build_memory_health(runtime: Option<&RuntimeStats>, now: DateTime<Utc>) -> MemoryHealth {
    let Some(stats) = runtime else {
        return MemoryHealth {
            status: HealthStatus::Unknown,
            last_checked: now,
            heap_used_bytes: 0,
            heap_max_bytes: 0,
            non_heap_used_bytes: 0,
            non_heap_max_bytes: 0,
            memory_usage: 0.0,
            gc_count: 0,
            gc_time_ms: 0,
            gc_pressure: 0.0,
        };
    };

    let usage = stats.memory_usage();
    let gc_pressure = stats.gc_pressure();

    let status = if usage > 0.9 || gc_pressure > 0.1 {
        HealthStatus::Critical
    } else if usage > 0.8 || gc_pressure > 0.05 {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    };

    MemoryHealth {
        status,
        last_checked: now,
        heap_used_bytes: stats.heap_used_bytes,
        heap_max_bytes: stats.heap_max_bytes,
        non_heap_used_bytes: stats.non_heap_used_bytes,
        non_heap_max_bytes: stats.non_heap_max_bytes,
        memory_usage: usage,
        gc_count: stats.gc_count,
        gc_time_ms: stats.gc_time_ms,
        gc_pressure,
    }
}

fn build_response_health(stats: &RequestStats, now: DateTime<Utc>) -> ResponseTimeHealth {
    let error_rate = stats.error_rate();

    let status = if error_rate > 0.05 {
        HealthStatus::Critical
    } else if stats.average_response_time_ms > 2000.0 {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    };

    ResponseTimeHealth {
        status,
        last_checked: now,
        average_response_time_ms: stats.average_response_time_ms,
        p95_response_time_ms: stats.p95_response_time_ms,
        p99_response_time_ms: stats.p99_response_time_ms,
        request_count: stats.request_count,
        error_count: stats.error_count,
        error_rate,
        throughput: stats.throughput,
    }
}

fn parse_fraction_detail(probe: &ProbeReport, key: &str) -> f64 {
    probe
        .details
        .get(key)
        .and_then(|v| v.parse::<f64>().ok())
        .map(|v| v.clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

fn build_custom_metrics(
    runtime: Option<&RuntimeStats>,
    cache: &ProbeReport,
    external_api: &ProbeReport,
    custom: &ProbeReport,
) -> HashMap<String, serde_json::Value> {
    let mut metrics = HashMap::new();
    if let Some(stats) = runtime {
        metrics.insert("threads.live".to_string(), json!(stats.thread_count));
        metrics.insert(
            "system.load.average.1m".to_string(),
            json!(stats.load_average),
        );
    }
    metrics.insert("cache.status".to_string(), json!(cache.status.to_string()));
    metrics.insert(
        "external_api.status".to_string(),
        json!(external_api.status.to_string()),
    );
    metrics.insert(
        "custom.status".to_string(),
        json!(custom.status.to_string()),
    );
    metrics
}
