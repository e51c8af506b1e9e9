//! Network remediation
//!
//! The agent cannot repair the network itself; these routines verify that
//! connectivity has returned against a configured set of well-known
//! endpoints and report success only when it has.

use crate::control::NetworkControl;
use crate::healing::strategy::HealingStrategy;
use crate::models::{HealthIssue, IssueCategory, IssueType};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Latency below this counts as recovered
const LATENCY_TARGET: Duration = Duration::from_millis(100);

pub struct NetworkHealingStrategy {
    network: Arc<dyn NetworkControl>,
    endpoints: Vec<(String, u16)>,
}

impl NetworkHealingStrategy {
    pub fn new(network: Arc<dyn NetworkControl>, endpoints: Vec<(String, u16)>) -> Self {
        Self { network, endpoints }
    }

    async fn all_reachable(&self) -> bool {
        if self.endpoints.is_empty() {
            warn!("No network endpoints configured, cannot verify connectivity");
            return false;
        }
        for (host, port) in &self.endpoints {
            if !self.network.test_connection(host, *port, PROBE_TIMEOUT).await {
                debug!(host = %host, port, "Endpoint unreachable");
                return false;
            }
        }
        true
    }

    async fn all_resolvable(&self) -> bool {
        if self.endpoints.is_empty() {
            warn!("No network endpoints configured, cannot verify resolution");
            return false;
        }
        for (host, _) in &self.endpoints {
            if !self.network.resolve(host).await {
                debug!(host = %host, "Host did not resolve");
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl HealingStrategy for NetworkHealingStrategy {
    fn category(&self) -> IssueCategory {
        IssueCategory::Network
    }

    async fn heal(&self, issue: &HealthIssue) -> anyhow::Result<bool> {
        match issue.issue_type {
            IssueType::ConnectionTimeout | IssueType::NetworkPartition => {
                Ok(self.all_reachable().await)
            }
            IssueType::DnsResolutionFailed => Ok(self.all_resolvable().await),
            IssueType::HighLatency => {
                let Some((host, port)) = self.endpoints.first() else {
                    warn!("No network endpoints configured, cannot measure latency");
                    return Ok(false);
                };
                let latency = self.network.measure_latency(host, *port, PROBE_TIMEOUT).await;
                Ok(matches!(latency, Some(d) if d < LATENCY_TARGET))
            }
            other => {
                warn!(issue_type = %other.as_str(), "No network remediation for issue type");
                Ok(false)
            }
        }
    }
}
