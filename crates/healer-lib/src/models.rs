//! Core data models for the self-healing agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Health status of the system or one of its sub-components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Down,
    Recovering,
    Unknown,
}

impl HealthStatus {
    /// Down and Critical dominate everything else in aggregation
    pub fn is_failing(&self) -> bool {
        matches!(self, HealthStatus::Down | HealthStatus::Critical)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Warning => "WARNING",
            HealthStatus::Critical => "CRITICAL",
            HealthStatus::Down => "DOWN",
            HealthStatus::Recovering => "RECOVERING",
            HealthStatus::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

/// Database sub-health for one sampling cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: HealthStatus,
    pub last_checked: DateTime<Utc>,
    pub active_connections: u32,
    pub max_connections: u32,
    pub connection_pool_usage: f64,
    pub average_query_time_ms: u64,
    pub slow_query_count: u64,
    pub deadlock_count: u64,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl DatabaseHealth {
    pub fn connection_pool_healthy(&self) -> bool {
        self.connection_pool_usage < 0.8
    }

    pub fn has_slow_queries(&self) -> bool {
        self.average_query_time_ms > 1000
    }

    pub fn has_deadlocks(&self) -> bool {
        self.deadlock_count > 0
    }
}

/// Memory sub-health for one sampling cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryHealth {
    pub status: HealthStatus,
    pub last_checked: DateTime<Utc>,
    pub heap_used_bytes: u64,
    pub heap_max_bytes: u64,
    pub non_heap_used_bytes: u64,
    pub non_heap_max_bytes: u64,
    pub memory_usage: f64,
    pub gc_count: u64,
    pub gc_time_ms: u64,
    pub gc_pressure: f64,
}

impl MemoryHealth {
    pub fn memory_pressure_high(&self) -> bool {
        self.memory_usage > 0.85
    }

    pub fn gc_pressure_high(&self) -> bool {
        self.gc_pressure > 0.1
    }

    pub fn requires_cleanup(&self) -> bool {
        self.memory_pressure_high() || self.gc_pressure_high()
    }
}

/// Response-time sub-health for one sampling cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseTimeHealth {
    pub status: HealthStatus,
    pub last_checked: DateTime<Utc>,
    pub average_response_time_ms: f64,
    pub p95_response_time_ms: f64,
    pub p99_response_time_ms: f64,
    pub request_count: u64,
    pub error_count: u64,
    pub error_rate: f64,
    pub throughput: f64,
}

impl ResponseTimeHealth {
    pub fn response_time_slow(&self) -> bool {
        self.average_response_time_ms > 2000.0
    }

    pub fn high_error_rate(&self) -> bool {
        self.error_rate > 0.05
    }

    pub fn performance_degraded(&self) -> bool {
        self.response_time_slow() || self.high_error_rate()
    }
}

/// Aggregated health snapshot for one cycle, never mutated after construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<ResponseTimeHealth>,
    pub cpu_usage: f64,
    pub disk_usage: f64,
    pub active_connections: u64,
    pub requests_per_second: f64,
    pub custom_metrics: HashMap<String, serde_json::Value>,
}

impl SystemHealth {
    /// Worst-of aggregation: Down/Critical from any sub-health dominates,
    /// then Warning, else Healthy. Missing sub-healths are ignored.
    pub fn aggregate_status(statuses: &[HealthStatus]) -> HealthStatus {
        if statuses.iter().any(|s| s.is_failing()) {
            return HealthStatus::Critical;
        }
        if statuses.iter().any(|s| *s == HealthStatus::Warning) {
            return HealthStatus::Warning;
        }
        HealthStatus::Healthy
    }

    pub fn is_healthy(&self) -> bool {
        self.overall_status == HealthStatus::Healthy
    }

    pub fn requires_attention(&self) -> bool {
        matches!(
            self.overall_status,
            HealthStatus::Warning | HealthStatus::Critical
        )
    }

    pub fn is_critical(&self) -> bool {
        self.overall_status.is_failing()
    }
}

/// Coarse routing key for healing strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCategory {
    Database,
    Memory,
    Network,
    Application,
    System,
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IssueCategory::Database => "DATABASE",
            IssueCategory::Memory => "MEMORY",
            IssueCategory::Network => "NETWORK",
            IssueCategory::Application => "APPLICATION",
            IssueCategory::System => "SYSTEM",
        };
        write!(f, "{}", s)
    }
}

/// Fine-grained issue classification, closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    DatabaseUnhealthy,
    SlowQueries,
    ConnectionPoolExhausted,
    DeadlockDetected,
    HighMemoryUsage,
    HighGcPressure,
    MemoryLeak,
    OutOfMemory,
    SlowResponseTime,
    HighErrorRate,
    ThreadPoolExhausted,
    CircuitBreakerOpen,
    ConnectionTimeout,
    DnsResolutionFailed,
    NetworkPartition,
    HighLatency,
    HighCpuUsage,
}

impl IssueType {
    /// The category whose strategy handles this issue type
    pub fn category(&self) -> IssueCategory {
        match self {
            IssueType::DatabaseUnhealthy
            | IssueType::SlowQueries
            | IssueType::ConnectionPoolExhausted
            | IssueType::DeadlockDetected => IssueCategory::Database,
            IssueType::HighMemoryUsage
            | IssueType::HighGcPressure
            | IssueType::MemoryLeak
            | IssueType::OutOfMemory => IssueCategory::Memory,
            IssueType::ConnectionTimeout
            | IssueType::DnsResolutionFailed
            | IssueType::NetworkPartition
            | IssueType::HighLatency => IssueCategory::Network,
            IssueType::SlowResponseTime
            | IssueType::HighErrorRate
            | IssueType::ThreadPoolExhausted
            | IssueType::CircuitBreakerOpen => IssueCategory::Application,
            IssueType::HighCpuUsage => IssueCategory::System,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::DatabaseUnhealthy => "DATABASE_UNHEALTHY",
            IssueType::SlowQueries => "SLOW_QUERIES",
            IssueType::ConnectionPoolExhausted => "CONNECTION_POOL_EXHAUSTED",
            IssueType::DeadlockDetected => "DEADLOCK_DETECTED",
            IssueType::HighMemoryUsage => "HIGH_MEMORY_USAGE",
            IssueType::HighGcPressure => "HIGH_GC_PRESSURE",
            IssueType::MemoryLeak => "MEMORY_LEAK",
            IssueType::OutOfMemory => "OUT_OF_MEMORY",
            IssueType::SlowResponseTime => "SLOW_RESPONSE_TIME",
            IssueType::HighErrorRate => "HIGH_ERROR_RATE",
            IssueType::ThreadPoolExhausted => "THREAD_POOL_EXHAUSTED",
            IssueType::CircuitBreakerOpen => "CIRCUIT_BREAKER_OPEN",
            IssueType::ConnectionTimeout => "CONNECTION_TIMEOUT",
            IssueType::DnsResolutionFailed => "DNS_RESOLUTION_FAILED",
            IssueType::NetworkPartition => "NETWORK_PARTITION",
            IssueType::HighLatency => "HIGH_LATENCY",
            IssueType::HighCpuUsage => "HIGH_CPU_USAGE",
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Issue severity, Warning or Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueSeverity {
    Warning,
    Critical,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueSeverity::Warning => write!(f, "WARNING"),
            IssueSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A classified anomaly detected from one snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthIssue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub category: IssueCategory,
    pub severity: IssueSeverity,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    pub context: HashMap<String, serde_json::Value>,
}

impl HealthIssue {
    pub fn is_critical(&self) -> bool {
        self.severity == IssueSeverity::Critical
    }

    pub fn is_warning(&self) -> bool {
        self.severity == IssueSeverity::Warning
    }
}

/// Risk categories scored by the predictive model
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    MemoryPressure,
    DatabaseSlow,
    HighResponseTime,
    CpuPressure,
    DiskPressure,
}

impl RiskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::MemoryPressure => "MEMORY_PRESSURE",
            RiskCategory::DatabaseSlow => "DATABASE_SLOW",
            RiskCategory::HighResponseTime => "HIGH_RESPONSE_TIME",
            RiskCategory::CpuPressure => "CPU_PRESSURE",
            RiskCategory::DiskPressure => "DISK_PRESSURE",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Predictive model output for one snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
    pub risk_factors: Vec<RiskCategory>,
    pub risk_scores: BTreeMap<RiskCategory, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_failure_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_action: Option<String>,
}

impl Prediction {
    pub fn has_high_risk(&self) -> bool {
        self.confidence > 0.7 && !self.risk_factors.is_empty()
    }

    pub fn requires_immediate_action(&self) -> bool {
        self.confidence > 0.9
    }

    pub fn highest_risk_factor(&self) -> Option<RiskCategory> {
        self.risk_factors.first().copied()
    }
}

/// Healing statistics exposed on the agent API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealingStats {
    pub total_attempts: u64,
    pub active_issue_types: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check_time: Option<DateTime<Utc>>,
}
