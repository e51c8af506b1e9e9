//! Rule-based issue detection
//!
//! Applies the fixed threshold rules to one snapshot. Pure and
//! deterministic: identical snapshots produce identical issue lists in a
//! fixed emission order (database, memory, GC, response time, error rate,
//! CPU).

use crate::models::{
    HealthIssue, HealthStatus, IssueCategory, IssueSeverity, IssueType, SystemHealth,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;

/// CPU usage fraction above which HIGH_CPU_USAGE fires
const CPU_CRITICAL_THRESHOLD: f64 = 0.9;

/// Detect issues in a snapshot; all comparisons are strict
pub fn detect(health: &SystemHealth) -> Vec<HealthIssue> {
    let mut issues = Vec::new();
    let now = health.timestamp;

    if let Some(database) = &health.database {
        if database.status != HealthStatus::Healthy {
            let severity = if database.status == HealthStatus::Critical {
                IssueSeverity::Critical
            } else {
                IssueSeverity::Warning
            };
            issues.push(issue(
                IssueType::DatabaseUnhealthy,
                severity,
                "Database health is degraded",
                now,
                [("status", json!(database.status.to_string()))],
            ));
        }
    }

    if let Some(memory) = &health.memory {
        if memory.memory_pressure_high() {
            issues.push(issue(
                IssueType::HighMemoryUsage,
                IssueSeverity::Warning,
                "Memory usage is above 85%",
                now,
                [("usage", json!(memory.memory_usage))],
            ));
        }

        if memory.gc_pressure_high() {
            issues.push(issue(
                IssueType::HighGcPressure,
                IssueSeverity::Critical,
                "Garbage collection pressure is too high",
                now,
                [("gc_pressure", json!(memory.gc_pressure))],
            ));
        }
    }

    if let Some(response) = &health.response_time {
        if response.response_time_slow() {
            issues.push(issue(
                IssueType::SlowResponseTime,
                IssueSeverity::Warning,
                "Average response time is above threshold",
                now,
                [(
                    "average_response_time_ms",
                    json!(response.average_response_time_ms),
                )],
            ));
        }

        if response.high_error_rate() {
            issues.push(issue(
                IssueType::HighErrorRate,
                IssueSeverity::Critical,
                "Error rate is above 5%",
                now,
                [("error_rate", json!(response.error_rate))],
            ));
        }
    }

    if health.cpu_usage > CPU_CRITICAL_THRESHOLD {
        issues.push(issue(
            IssueType::HighCpuUsage,
            IssueSeverity::Critical,
            "CPU usage is above 90%",
            now,
            [("cpu_usage", json!(health.cpu_usage))],
        ));
    }

    issues
}

fn issue<const N: usize>(
    issue_type: IssueType,
    severity: IssueSeverity,
    description: &str,
    detected_at: DateTime<Utc>,
    context: [(&str, serde_json::Value); N],
) -> HealthIssue {
    let context: HashMap<String, serde_json::Value> = context
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    HealthIssue {
        issue_type,
        category: issue_type.category(),
        severity,
        description: description.to_string(),
        detected_at,
        context,
    }
}
