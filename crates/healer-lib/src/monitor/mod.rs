//! Health probing and runtime statistics
//!
//! This module provides the capability traits the sampler consumes:
//! tri-state health probes for external collaborators, runtime statistics
//! for the hosting process, and service-level request/database statistics.

mod providers;
mod sampler;

pub use providers::{
    DiskHealthProvider, StaticHealthProvider, SystemStatsProvider, TcpHealthProvider,
};
pub use sampler::{HealthMonitor, HealthProviders};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use async_trait::async_trait;

/// Tri-state outcome of a single health probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbeStatus {
    Up,
    Down,
    Error,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Up => write!(f, "UP"),
            ProbeStatus::Down => write!(f, "DOWN"),
            ProbeStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of probing one collaborator, status plus free-form details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub status: ProbeStatus,
    pub details: HashMap<String, String>,
}

impl ProbeReport {
    pub fn up() -> Self {
        Self {
            status: ProbeStatus::Up,
            details: HashMap::new(),
        }
    }

    pub fn down(reason: impl Into<String>) -> Self {
        let mut report = Self {
            status: ProbeStatus::Down,
            details: HashMap::new(),
        };
        report.details.insert("error".to_string(), reason.into());
        report
    }

    pub fn error(reason: impl Into<String>) -> Self {
        let mut report = Self {
            status: ProbeStatus::Error,
            details: HashMap::new(),
        };
        report.details.insert("error".to_string(), reason.into());
        report
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// A single health probe against an external collaborator
///
/// Implementations must fold their own failures into the report; `check`
/// never errors. The sampler additionally bounds every call with a timeout.
#[async_trait]
pub trait HealthProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> ProbeReport;
}

/// Point-in-time statistics about the hosting process runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeStats {
    pub heap_used_bytes: u64,
    pub heap_max_bytes: u64,
    pub non_heap_used_bytes: u64,
    pub non_heap_max_bytes: u64,
    pub gc_count: u64,
    pub gc_time_ms: u64,
    pub process_cpu_load: f64,
    pub thread_count: usize,
    pub load_average: f64,
    pub uptime_ms: u64,
}

impl RuntimeStats {
    /// Heap usage as a fraction of the maximum, zero when unbounded
    pub fn memory_usage(&self) -> f64 {
        if self.heap_max_bytes == 0 {
            return 0.0;
        }
        self.heap_used_bytes as f64 / self.heap_max_bytes as f64
    }

    /// Fraction of process lifetime spent in garbage collection
    pub fn gc_pressure(&self) -> f64 {
        if self.uptime_ms == 0 {
            return 0.0;
        }
        self.gc_time_ms as f64 / self.uptime_ms as f64
    }
}

#[async_trait]
pub trait RuntimeStatsProvider: Send + Sync {
    async fn stats(&self) -> Result<RuntimeStats>;
}

/// Connection-pool statistics for the monitored database
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub active_connections: u32,
    pub max_connections: u32,
    pub average_query_time_ms: u64,
    pub slow_query_count: u64,
    pub deadlock_count: u64,
}

impl DatabaseStats {
    pub fn pool_usage(&self) -> f64 {
        if self.max_connections == 0 {
            return 0.0;
        }
        self.active_connections as f64 / self.max_connections as f64
    }
}

/// Request/response statistics for the monitored service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestStats {
    pub average_response_time_ms: f64,
    pub p95_response_time_ms: f64,
    pub p99_response_time_ms: f64,
    pub request_count: u64,
    pub error_count: u64,
    pub throughput: f64,
}

impl RequestStats {
    pub fn error_rate(&self) -> f64 {
        if self.request_count == 0 {
            return 0.0;
        }
        self.error_count as f64 / self.request_count as f64
    }
}

/// Service-level statistics the monitored application exposes in-process
pub trait ServiceStatsProvider: Send + Sync {
    fn database_stats(&self) -> DatabaseStats;

    fn request_stats(&self) -> RequestStats;
}
