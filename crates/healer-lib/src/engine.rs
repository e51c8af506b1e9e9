//! The monitoring and healing control loop
//!
//! One cycle per tick: sample, record, detect, dispatch healing per
//! issue, predict, mitigate proactively. A failing collaborator degrades
//! its part of the cycle; the loop itself never stops until shutdown.

use crate::detector;
use crate::healing::{HealingDispatcher, ProactiveHealer};
use crate::models::{HealingStats, HealthIssue, SystemHealth};
use crate::monitor::HealthMonitor;
use crate::predictor::PredictiveAnalyzer;
use crate::sink::MetricsSink;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Default gap between monitoring cycles
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

pub struct HealingEngine {
    monitor: HealthMonitor,
    analyzer: PredictiveAnalyzer,
    dispatcher: Arc<HealingDispatcher>,
    proactive: Arc<ProactiveHealer>,
    sink: Arc<dyn MetricsSink>,
    check_interval: Duration,
    last_check: RwLock<Option<DateTime<Utc>>>,
}

impl HealingEngine {
    pub fn new(
        monitor: HealthMonitor,
        dispatcher: Arc<HealingDispatcher>,
        proactive: Arc<ProactiveHealer>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            monitor,
            analyzer: PredictiveAnalyzer::new(),
            dispatcher,
            proactive,
            sink,
            check_interval: DEFAULT_CHECK_INTERVAL,
            last_check: RwLock::new(None),
        }
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Run the monitoring loop until shutdown
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        info!(
            interval_secs = self.check_interval.as_secs(),
            "Starting healing engine"
        );

        let mut ticker = tokio::time::interval(self.check_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Healing runs detached so a slow remediation never
                    // delays the next sampling tick
                    let issues = self.observe_and_predict().await;
                    if !issues.is_empty() {
                        let engine = self.clone();
                        tokio::spawn(async move { engine.heal_issues(issues).await });
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down healing engine");
                    break;
                }
            }
        }
    }

    /// One full monitor-detect-heal-predict cycle, awaiting remediation
    pub async fn run_cycle(&self) {
        let issues = self.observe_and_predict().await;
        self.heal_issues(issues).await;
    }

    /// Sample, record, detect, and run the predictive path; returns the
    /// detected issues for dispatch
    async fn observe_and_predict(&self) -> Vec<HealthIssue> {
        let start = Instant::now();
        let health = self.monitor.sample().await;
        self.sink
            .record_check_duration(start.elapsed().as_secs_f64());
        self.sink.record_snapshot(&health);
        *self.last_check.write().await = Some(health.timestamp);

        let issues = detector::detect(&health);
        if !issues.is_empty() {
            warn!(
                count = issues.len(),
                overall_status = %health.overall_status,
                "Detected health issues"
            );
        }

        let prediction = self.analyzer.predict(&health);
        self.sink.record_prediction(&prediction);
        if prediction.has_high_risk() {
            warn!(
                confidence = prediction.confidence,
                risk_factors = ?prediction.risk_factors,
                recommended_action = ?prediction.recommended_action,
                "Elevated failure risk predicted"
            );
        }
        self.proactive.apply(&prediction).await;

        issues
    }

    /// Dispatch every issue concurrently on tracked tasks
    async fn heal_issues(&self, issues: Vec<HealthIssue>) {
        let mut tasks = JoinSet::new();
        for issue in issues {
            let dispatcher = self.dispatcher.clone();
            tasks.spawn(async move { dispatcher.dispatch(&issue).await });
        }
        while let Some(result) = tasks.join_next().await {
            if result.is_err() {
                error!("Healing task aborted unexpectedly");
                self.sink.record_cycle_error();
            }
        }
    }

    /// Take a fresh snapshot outside the loop
    pub async fn current_health(&self) -> SystemHealth {
        self.monitor.sample().await
    }

    /// Run one cycle on demand
    pub async fn trigger_check(&self) {
        info!("Manual health check triggered");
        self.run_cycle().await;
    }

    /// Predict from a fresh snapshot without dispatching anything
    pub async fn current_prediction(&self) -> crate::models::Prediction {
        let health = self.monitor.sample().await;
        self.analyzer.predict(&health)
    }

    pub async fn healing_statistics(&self) -> HealingStats {
        HealingStats {
            total_attempts: self.dispatcher.total_attempts(),
            active_issue_types: self.dispatcher.active_issue_types(),
            last_check_time: *self.last_check.read().await,
        }
    }
}
