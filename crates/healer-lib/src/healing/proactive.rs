//! Proactive remediation from predictions
//!
//! When a prediction clears the action threshold, the named risk factors
//! are mitigated preemptively, before any threshold rule has fired.

use crate::control::{CacheControl, DatabaseControl, RuntimeControl};
use crate::models::{Prediction, RiskCategory};
use crate::predictor::ACTION_CONFIDENCE_THRESHOLD;
use crate::sink::{MetricsSink, ProactiveOutcome};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ProactiveHealer {
    cache: Arc<dyn CacheControl>,
    runtime: Arc<dyn RuntimeControl>,
    database: Arc<dyn DatabaseControl>,
    sink: Arc<dyn MetricsSink>,
}

impl ProactiveHealer {
    pub fn new(
        cache: Arc<dyn CacheControl>,
        runtime: Arc<dyn RuntimeControl>,
        database: Arc<dyn DatabaseControl>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            cache,
            runtime,
            database,
            sink,
        }
    }

    /// Mitigate each risk factor of an actionable prediction
    pub async fn apply(&self, prediction: &Prediction) {
        if prediction.confidence <= ACTION_CONFIDENCE_THRESHOLD {
            return;
        }

        info!(
            confidence = prediction.confidence,
            factors = prediction.risk_factors.len(),
            "Applying proactive mitigation"
        );

        for factor in &prediction.risk_factors {
            let result = match factor {
                RiskCategory::MemoryPressure => Some(self.release_memory().await),
                RiskCategory::DatabaseSlow => {
                    Some(self.database.optimize().await.map_err(Into::into))
                }
                RiskCategory::HighResponseTime => Some(self.release_memory().await),
                RiskCategory::CpuPressure | RiskCategory::DiskPressure => {
                    // Needs operator or scheduler intervention
                    debug!(factor = ?factor, "No automated proactive action");
                    None
                }
            };

            let outcome = match result {
                Some(Ok(())) => ProactiveOutcome::Mitigated,
                Some(Err(e)) => {
                    warn!(factor = ?factor, error = %e, "Proactive mitigation failed");
                    ProactiveOutcome::Failed
                }
                None => ProactiveOutcome::Skipped,
            };
            self.sink
                .record_proactive(*factor, outcome, prediction.confidence);
        }
    }

    async fn release_memory(&self) -> anyhow::Result<()> {
        self.cache.clear_all().await?;
        self.runtime.request_gc().await?;
        Ok(())
    }
}
