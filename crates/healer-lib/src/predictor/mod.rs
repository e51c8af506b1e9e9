//! Predictive risk model
//!
//! Deterministic, explainable scoring off one snapshot: per-category risk
//! functions, an aggregate confidence, and a recommended action once the
//! confidence crosses the action threshold. Not a trained model.

mod risk;

pub use risk::{cpu_risk, database_risk, disk_risk, memory_risk, response_time_risk};

use crate::models::{Prediction, RiskCategory, SystemHealth};
use chrono::{Duration, Utc};
use std::collections::BTreeMap;

/// Scores above this become risk factors
pub const RISK_FACTOR_THRESHOLD: f64 = 0.5;

/// Scores above this count as high risk for the confidence boost
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;

/// Confidence multiplier when multiple categories are high risk
pub const CONFIDENCE_BOOST: f64 = 1.2;

/// Confidence above this produces a failure time and recommended action,
/// and arms the proactive healing path
pub const ACTION_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Deterministic failure predictor over one snapshot
#[derive(Debug, Clone, Default)]
pub struct PredictiveAnalyzer;

impl PredictiveAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Score a snapshot; missing sub-healths omit their category
    pub fn predict(&self, health: &SystemHealth) -> Prediction {
        let risk_scores = self.score(health);
        let risk_factors = identify_risk_factors(&risk_scores);
        let confidence = overall_confidence(&risk_scores);

        let (predicted_failure_time, recommended_action) =
            if confidence > ACTION_CONFIDENCE_THRESHOLD {
                let minutes = time_to_failure_minutes(&risk_scores);
                (
                    Some(Utc::now() + Duration::minutes(minutes)),
                    Some(recommended_action(&risk_factors).to_string()),
                )
            } else {
                (None, None)
            };

        Prediction {
            timestamp: Utc::now(),
            confidence,
            risk_factors,
            risk_scores,
            predicted_failure_time,
            recommended_action,
        }
    }

    /// Per-category scores; zero scores are omitted so the confidence
    /// reflects only categories showing risk
    fn score(&self, health: &SystemHealth) -> BTreeMap<RiskCategory, f64> {
        let mut scores = BTreeMap::new();

        if let Some(memory) = &health.memory {
            insert_nonzero(&mut scores, RiskCategory::MemoryPressure, memory_risk(memory));
        }
        if let Some(database) = &health.database {
            insert_nonzero(
                &mut scores,
                RiskCategory::DatabaseSlow,
                database_risk(database),
            );
        }
        if let Some(response) = &health.response_time {
            insert_nonzero(
                &mut scores,
                RiskCategory::HighResponseTime,
                response_time_risk(response),
            );
        }
        insert_nonzero(&mut scores, RiskCategory::CpuPressure, cpu_risk(health.cpu_usage));
        insert_nonzero(
            &mut scores,
            RiskCategory::DiskPressure,
            disk_risk(health.disk_usage),
        );

        scores
    }
}

fn insert_nonzero(scores: &mut BTreeMap<RiskCategory, f64>, category: RiskCategory, score: f64) {
    if score > 0.0 {
        scores.insert(category, score);
    }
}

/// Categories scoring above the factor threshold, descending by score;
/// declaration order of `RiskCategory` breaks ties
fn identify_risk_factors(scores: &BTreeMap<RiskCategory, f64>) -> Vec<RiskCategory> {
    let mut factors: Vec<(RiskCategory, f64)> = scores
        .iter()
        .filter(|(_, score)| **score > RISK_FACTOR_THRESHOLD)
        .map(|(category, score)| (*category, *score))
        .collect();
    factors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    factors.into_iter().map(|(category, _)| category).collect()
}

/// Mean of the computed scores, boosted when more than one category is
/// high risk, always within [0, 1]
fn overall_confidence(scores: &BTreeMap<RiskCategory, f64>) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }

    let total: f64 = scores.values().sum();
    let mut confidence = total / scores.len() as f64;

    let high_risk_count = scores
        .values()
        .filter(|score| **score > HIGH_RISK_THRESHOLD)
        .count();
    if high_risk_count > 1 {
        confidence = (confidence * CONFIDENCE_BOOST).min(1.0);
    }

    confidence
}

/// Higher maximum risk means a shorter predicted time to failure
fn time_to_failure_minutes(scores: &BTreeMap<RiskCategory, f64>) -> i64 {
    let max_risk = scores.values().cloned().fold(0.0, f64::max);

    if max_risk > 0.9 {
        5
    } else if max_risk > 0.8 {
        15
    } else if max_risk > 0.7 {
        30
    } else {
        60
    }
}

fn recommended_action(factors: &[RiskCategory]) -> &'static str {
    let Some(primary) = factors.first() else {
        return "No immediate action required";
    };

    match primary {
        RiskCategory::MemoryPressure => "Clear caches and trigger garbage collection",
        RiskCategory::DatabaseSlow => "Optimize database queries and check connection pool",
        RiskCategory::HighResponseTime => {
            "Scale application resources and optimize performance"
        }
        RiskCategory::CpuPressure => "Scale CPU resources or reduce load",
        RiskCategory::DiskPressure => "Clean up disk space and archive old data",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HealthStatus, ResponseTimeHealth, SystemHealth};
    use std::collections::HashMap;

    fn snapshot() -> SystemHealth {
        SystemHealth {
            overall_status: HealthStatus::Healthy,
            timestamp: Utc::now(),
            database: None,
            memory: None,
            response_time: None,
            cpu_usage: 0.0,
            disk_usage: 0.0,
            active_connections: 0,
            requests_per_second: 0.0,
            custom_metrics: HashMap::new(),
        }
    }

    fn response(avg_ms: f64, error_rate: f64) -> ResponseTimeHealth {
        ResponseTimeHealth {
            status: HealthStatus::Healthy,
            last_checked: Utc::now(),
            average_response_time_ms: avg_ms,
            p95_response_time_ms: 0.0,
            p99_response_time_ms: 0.0,
            request_count: 0,
            error_count: 0,
            error_rate,
            throughput: 0.0,
        }
    }

    #[test]
    fn test_empty_snapshot_predicts_nothing() {
        let prediction = PredictiveAnalyzer::new().predict(&snapshot());
        assert_eq!(prediction.confidence, 0.0);
        assert!(prediction.risk_factors.is_empty());
        assert!(prediction.risk_scores.is_empty());
        assert!(prediction.predicted_failure_time.is_none());
        assert!(prediction.recommended_action.is_none());
    }

    #[test]
    fn test_response_time_scenario_triggers_action() {
        // Error rate 0.12 plus 3000 ms average saturates response risk,
        // confidence exceeds the action threshold, and the recommended
        // action targets scaling
        let mut health = snapshot();
        health.response_time = Some(response(3000.0, 0.12));

        let prediction = PredictiveAnalyzer::new().predict(&health);
        assert_eq!(
            prediction.risk_scores[&RiskCategory::HighResponseTime],
            1.0
        );
        assert!(prediction.confidence > 0.8);
        assert_eq!(
            prediction.risk_factors,
            vec![RiskCategory::HighResponseTime]
        );
        assert!(prediction.predicted_failure_time.is_some());
        assert_eq!(
            prediction.recommended_action.as_deref(),
            Some("Scale application resources and optimize performance")
        );
    }

    #[test]
    fn test_confidence_boost_is_capped() {
        let mut scores = BTreeMap::new();
        scores.insert(RiskCategory::MemoryPressure, 0.9);
        scores.insert(RiskCategory::CpuPressure, 0.9);
        // Mean 0.9 boosted by 1.2 would be 1.08, capped at 1.0
        assert_eq!(overall_confidence(&scores), 1.0);
    }

    #[test]
    fn test_confidence_boost_requires_two_high_scores() {
        let mut scores = BTreeMap::new();
        scores.insert(RiskCategory::MemoryPressure, 0.8);
        scores.insert(RiskCategory::CpuPressure, 0.4);
        // Only one score above 0.7, no boost
        assert!((overall_confidence(&scores) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_risk_factors_sorted_descending() {
        let mut scores = BTreeMap::new();
        scores.insert(RiskCategory::MemoryPressure, 0.6);
        scores.insert(RiskCategory::DatabaseSlow, 0.9);
        scores.insert(RiskCategory::CpuPressure, 0.4);

        let factors = identify_risk_factors(&scores);
        assert_eq!(
            factors,
            vec![RiskCategory::DatabaseSlow, RiskCategory::MemoryPressure]
        );
    }

    #[test]
    fn test_risk_factor_threshold_is_strict() {
        let mut scores = BTreeMap::new();
        scores.insert(RiskCategory::MemoryPressure, 0.5);
        assert!(identify_risk_factors(&scores).is_empty());
    }

    #[test]
    fn test_time_to_failure_buckets() {
        let bucket = |score: f64| {
            let mut scores = BTreeMap::new();
            scores.insert(RiskCategory::CpuPressure, score);
            time_to_failure_minutes(&scores)
        };
        assert_eq!(bucket(0.95), 5);
        assert_eq!(bucket(0.85), 15);
        assert_eq!(bucket(0.75), 30);
        assert_eq!(bucket(0.6), 60);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let mut health = snapshot();
        health.response_time = Some(response(3000.0, 0.12));
        health.cpu_usage = 0.92;

        let analyzer = PredictiveAnalyzer::new();
        let first = analyzer.predict(&health);
        let second = analyzer.predict(&health);

        assert_eq!(first.risk_scores, second.risk_scores);
        assert_eq!(first.risk_factors, second.risk_factors);
        assert_eq!(first.confidence, second.confidence);
    }
}
