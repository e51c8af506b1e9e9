//! Outcome recording seam
//!
//! The engine and dispatcher report what happened through this trait so
//! the exporter (Prometheus in the binary) stays out of the core crate.

use crate::models::{IssueType, Prediction, RiskCategory, SystemHealth};

/// What happened to one risk factor during proactive mitigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProactiveOutcome {
    Mitigated,
    Failed,
    /// Factor has no automated mitigation; recorded but not acted on
    Skipped,
}

impl ProactiveOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProactiveOutcome::Mitigated => "success",
            ProactiveOutcome::Failed => "failure",
            ProactiveOutcome::Skipped => "skipped",
        }
    }
}

/// Receives monitoring and healing outcomes; all methods default to no-ops
pub trait MetricsSink: Send + Sync {
    fn record_snapshot(&self, _health: &SystemHealth) {}

    fn record_check_duration(&self, _duration_secs: f64) {}

    /// A healing attempt completed; `reason` explains failures
    fn record_healing_outcome(&self, _issue_type: IssueType, _success: bool, _reason: &str) {}

    fn record_prediction(&self, _prediction: &Prediction) {}

    /// Every risk factor of an actionable prediction is reported here,
    /// skipped ones included, along with the prediction's confidence
    fn record_proactive(&self, _category: RiskCategory, _outcome: ProactiveOutcome, _confidence: f64) {
    }

    fn record_cycle_error(&self) {}
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MetricsSink for NullSink {}
