//! Memory remediation

use crate::control::{CacheControl, RuntimeControl};
use crate::healing::strategy::HealingStrategy;
use crate::models::{HealthIssue, IssueCategory, IssueType};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Heap usage fraction remediation must get below to count as success
const MEMORY_RECOVERY_TARGET: f64 = 0.8;

const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Clears caches and requests memory release
pub struct MemoryHealingStrategy {
    cache: Arc<dyn CacheControl>,
    runtime: Arc<dyn RuntimeControl>,
    settle_delay: Duration,
}

impl MemoryHealingStrategy {
    pub fn new(cache: Arc<dyn CacheControl>, runtime: Arc<dyn RuntimeControl>) -> Self {
        Self {
            cache,
            runtime,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    async fn clear_and_release(&self) -> anyhow::Result<()> {
        let cleared = self.cache.clear_all().await?;
        self.runtime.request_gc().await?;
        info!(entries_cleared = cleared, "Cleared caches and requested memory release");
        Ok(())
    }
}

#[async_trait]
impl HealingStrategy for MemoryHealingStrategy {
    fn category(&self) -> IssueCategory {
        IssueCategory::Memory
    }

    async fn heal(&self, issue: &HealthIssue) -> anyhow::Result<bool> {
        match issue.issue_type {
            IssueType::HighMemoryUsage => {
                self.clear_and_release().await?;
                // Give the allocator a moment, then verify against the
                // recovery target
                tokio::time::sleep(self.settle_delay).await;
                let usage = self.runtime.heap_usage().await?;
                Ok(usage < MEMORY_RECOVERY_TARGET)
            }
            IssueType::HighGcPressure | IssueType::MemoryLeak | IssueType::OutOfMemory => {
                self.clear_and_release().await?;
                Ok(true)
            }
            other => {
                warn!(issue_type = %other.as_str(), "No memory remediation for issue type");
                Ok(false)
            }
        }
    }
}
