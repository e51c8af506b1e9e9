//! Self-healing agent library
//!
//! This crate provides the core functionality for:
//! - Health sampling and aggregation
//! - Rule-based issue detection
//! - Deterministic failure prediction
//! - Automatic and proactive remediation
//! - Observability

pub mod control;
pub mod detector;
pub mod engine;
pub mod healing;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod predictor;
pub mod sink;

pub use engine::{HealingEngine, DEFAULT_CHECK_INTERVAL};
pub use models::*;
pub use observability::HealerMetrics;
pub use sink::{MetricsSink, NullSink, ProactiveOutcome};
