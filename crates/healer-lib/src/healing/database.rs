//! Database remediation

use crate::control::DatabaseControl;
use crate::healing::strategy::HealingStrategy;
use crate::models::{HealthIssue, IssueCategory, IssueType};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const VALIDATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Revalidates, resets, or optimizes the database connection pool
pub struct DatabaseHealingStrategy {
    database: Arc<dyn DatabaseControl>,
}

impl DatabaseHealingStrategy {
    pub fn new(database: Arc<dyn DatabaseControl>) -> Self {
        Self { database }
    }
}

#[async_trait]
impl HealingStrategy for DatabaseHealingStrategy {
    fn category(&self) -> IssueCategory {
        IssueCategory::Database
    }

    async fn heal(&self, issue: &HealthIssue) -> anyhow::Result<bool> {
        match issue.issue_type {
            IssueType::DatabaseUnhealthy => {
                let valid = self.database.validate_connection(VALIDATE_TIMEOUT).await?;
                if valid {
                    info!("Database connection validated");
                }
                Ok(valid)
            }
            IssueType::SlowQueries => {
                self.database.optimize().await?;
                Ok(true)
            }
            IssueType::ConnectionPoolExhausted => {
                self.database.reset_pool().await?;
                Ok(self.database.validate_connection(VALIDATE_TIMEOUT).await?)
            }
            IssueType::DeadlockDetected => {
                // Deadlocks resolve themselves once victims roll back; a
                // live connection means the pool recovered
                Ok(self.database.validate_connection(VALIDATE_TIMEOUT).await?)
            }
            other => {
                warn!(issue_type = %other.as_str(), "No database remediation for issue type");
                Ok(false)
            }
        }
    }
}
