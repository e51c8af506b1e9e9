//! Per-category risk scoring
//!
//! Each function is additive over its documented breakpoints and clamps
//! the result to [0, 1]. All comparisons are strict, so a value sitting
//! exactly on a breakpoint contributes the next band down.

use crate::models::{DatabaseHealth, MemoryHealth, ResponseTimeHealth};

/// Memory risk from heap usage and GC pressure
pub fn memory_risk(memory: &MemoryHealth) -> f64 {
    let mut risk: f64 = 0.0;

    if memory.memory_usage > 0.9 {
        risk += 0.8;
    } else if memory.memory_usage > 0.8 {
        risk += 0.5;
    } else if memory.memory_usage > 0.7 {
        risk += 0.3;
    }

    if memory.gc_pressure > 0.2 {
        risk += 0.7;
    } else if memory.gc_pressure > 0.1 {
        risk += 0.4;
    }

    risk.min(1.0)
}

/// Database risk from pool usage, query latency, and deadlocks
pub fn database_risk(database: &DatabaseHealth) -> f64 {
    let mut risk: f64 = 0.0;

    if database.connection_pool_usage > 0.9 {
        risk += 0.7;
    } else if database.connection_pool_usage > 0.8 {
        risk += 0.4;
    }

    if database.average_query_time_ms > 2000 {
        risk += 0.6;
    } else if database.average_query_time_ms > 1000 {
        risk += 0.3;
    }

    if database.deadlock_count > 0 {
        risk += 0.5;
    }

    risk.min(1.0)
}

/// Response-time risk from latency and error rate
pub fn response_time_risk(response: &ResponseTimeHealth) -> f64 {
    let mut risk: f64 = 0.0;

    if response.average_response_time_ms > 5000.0 {
        risk += 0.8;
    } else if response.average_response_time_ms > 2000.0 {
        risk += 0.5;
    } else if response.average_response_time_ms > 1000.0 {
        risk += 0.3;
    }

    if response.error_rate > 0.1 {
        risk += 0.9;
    } else if response.error_rate > 0.05 {
        risk += 0.6;
    } else if response.error_rate > 0.02 {
        risk += 0.3;
    }

    risk.min(1.0)
}

/// CPU risk from the process CPU load fraction
pub fn cpu_risk(cpu_usage: f64) -> f64 {
    if cpu_usage > 0.95 {
        0.9
    } else if cpu_usage > 0.9 {
        0.7
    } else if cpu_usage > 0.8 {
        0.4
    } else if cpu_usage > 0.7 {
        0.2
    } else {
        0.0
    }
}

/// Disk risk from the filesystem usage fraction
pub fn disk_risk(disk_usage: f64) -> f64 {
    if disk_usage > 0.95 {
        0.8
    } else if disk_usage > 0.9 {
        0.6
    } else if disk_usage > 0.8 {
        0.3
    } else {
        0.0
    }
}
