//! Resource-control handles used by remediation
//!
//! One capability trait per resource kind, so strategies never reach into
//! concrete infrastructure. Every operation that touches the outside world
//! takes or carries an explicit timeout.

use crate::monitor::RuntimeStatsProvider;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Errors surfaced by control-handle operations
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("resource unavailable: {0}")]
    Unavailable(String),
}

pub type ControlResult<T> = Result<T, ControlError>;

/// Database pool control: validation and pool-level mitigation hints
#[async_trait]
pub trait DatabaseControl: Send + Sync {
    /// Test a pooled connection within the given timeout
    async fn validate_connection(&self, timeout: Duration) -> ControlResult<bool>;

    /// Pool-level mitigation, e.g. evicting idle connections
    async fn reset_pool(&self) -> ControlResult<()>;

    /// Query-path optimization hint
    async fn optimize(&self) -> ControlResult<()>;
}

/// Application cache control
#[async_trait]
pub trait CacheControl: Send + Sync {
    /// Clear every cache, returning the number of entries dropped
    async fn clear_all(&self) -> ControlResult<u64>;
}

/// Network reachability and latency probes
#[async_trait]
pub trait NetworkControl: Send + Sync {
    async fn test_connection(&self, host: &str, port: u16, timeout: Duration) -> bool;

    async fn measure_latency(&self, host: &str, port: u16, timeout: Duration)
        -> Option<Duration>;

    async fn resolve(&self, host: &str) -> bool;
}

/// Process runtime control: advisory GC and usage readback
#[async_trait]
pub trait RuntimeControl: Send + Sync {
    /// Advisory request to release memory; completion is best effort
    async fn request_gc(&self) -> ControlResult<()>;

    /// Current heap usage as a fraction of the maximum
    async fn heap_usage(&self) -> ControlResult<f64>;

    async fn thread_count(&self) -> ControlResult<usize>;
}

/// Database control over a TCP endpoint
///
/// Validation is reduced to reachability; pool reset and optimization
/// revalidate the endpoint, which is all a detached agent can do.
pub struct TcpDatabaseControl {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpDatabaseControl {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    async fn connect(&self, timeout: Duration) -> bool {
        let addr = format!("{}:{}", self.host, self.port);
        matches!(
            tokio::time::timeout(timeout, TcpStream::connect(&addr)).await,
            Ok(Ok(_))
        )
    }
}

#[async_trait]
impl DatabaseControl for TcpDatabaseControl {
    async fn validate_connection(&self, timeout: Duration) -> ControlResult<bool> {
        Ok(self.connect(timeout).await)
    }

    async fn reset_pool(&self) -> ControlResult<()> {
        info!(host = %self.host, port = self.port, "Resetting connection pool");
        if self.connect(self.timeout).await {
            Ok(())
        } else {
            Err(ControlError::Unavailable(format!(
                "{}:{} unreachable during pool reset",
                self.host, self.port
            )))
        }
    }

    async fn optimize(&self) -> ControlResult<()> {
        info!(host = %self.host, port = self.port, "Optimizing database connections");
        if self.connect(self.timeout).await {
            Ok(())
        } else {
            Err(ControlError::Unavailable(format!(
                "{}:{} unreachable during optimization",
                self.host, self.port
            )))
        }
    }
}

/// Named in-process caches the agent can drop wholesale
#[derive(Default)]
pub struct CacheRegistry {
    caches: DashMap<String, DashMap<String, serde_json::Value>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        cache: impl Into<String>,
        key: impl Into<String>,
        value: serde_json::Value,
    ) {
        self.caches
            .entry(cache.into())
            .or_default()
            .insert(key.into(), value);
    }

    pub fn get(&self, cache: &str, key: &str) -> Option<serde_json::Value> {
        self.caches
            .get(cache)
            .and_then(|c| c.get(key).map(|v| v.value().clone()))
    }

    pub fn entry_count(&self) -> u64 {
        self.caches.iter().map(|c| c.len() as u64).sum()
    }
}

#[async_trait]
impl CacheControl for CacheRegistry {
    async fn clear_all(&self) -> ControlResult<u64> {
        let mut cleared = 0u64;
        for cache in self.caches.iter() {
            cleared += cache.len() as u64;
            cache.clear();
            debug!(cache = %cache.key(), "Cleared cache");
        }
        if cleared > 0 {
            info!(entries = cleared, "All caches cleared");
        }
        Ok(cleared)
    }
}

/// Network control backed by tokio sockets and the system resolver
#[derive(Default)]
pub struct TcpNetworkControl;

impl TcpNetworkControl {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NetworkControl for TcpNetworkControl {
    async fn test_connection(&self, host: &str, port: u16, timeout: Duration) -> bool {
        let addr = format!("{}:{}", host, port);
        matches!(
            tokio::time::timeout(timeout, TcpStream::connect(&addr)).await,
            Ok(Ok(_))
        )
    }

    async fn measure_latency(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Option<Duration> {
        let addr = format!("{}:{}", host, port);
        let start = Instant::now();
        match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_)) => Some(start.elapsed()),
            _ => None,
        }
    }

    async fn resolve(&self, host: &str) -> bool {
        // Port is irrelevant for resolution, lookup_host requires one
        match tokio::net::lookup_host((host, 80)).await {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(_) => false,
        }
    }
}

/// Runtime control sharing the sampler's statistics provider
pub struct SystemRuntimeControl {
    stats: Arc<dyn RuntimeStatsProvider>,
}

impl SystemRuntimeControl {
    pub fn new(stats: Arc<dyn RuntimeStatsProvider>) -> Self {
        Self { stats }
    }
}

#[async_trait]
impl RuntimeControl for SystemRuntimeControl {
    async fn request_gc(&self) -> ControlResult<()> {
        // No collector to invoke; the allocator releases on its own
        // schedule once caches are dropped
        info!("Memory release requested");
        Ok(())
    }

    async fn heap_usage(&self) -> ControlResult<f64> {
        let stats = self
            .stats
            .stats()
            .await
            .map_err(|e| ControlError::Unavailable(e.to_string()))?;
        Ok(stats.memory_usage())
    }

    async fn thread_count(&self) -> ControlResult<usize> {
        let stats = self
            .stats
            .stats()
            .await
            .map_err(|e| ControlError::Unavailable(e.to_string()))?;
        Ok(stats.thread_count)
    }
}
