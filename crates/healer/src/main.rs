//! Self-healing agent
//!
//! This binary monitors a service's health, remediates detected issues,
//! and preempts predicted failures. It exposes an HTTP API for status,
//! statistics, and Prometheus metrics.

use anyhow::Result;
use healer_lib::control::{
    CacheRegistry, SystemRuntimeControl, TcpDatabaseControl, TcpNetworkControl,
};
use healer_lib::healing::{
    ApplicationHealingStrategy, DatabaseHealingStrategy, HealingDispatcher, HealingPolicy,
    MemoryHealingStrategy, NetworkHealingStrategy, ProactiveHealer, StrategyRegistry,
};
use healer_lib::monitor::{
    DatabaseStats, DiskHealthProvider, HealthMonitor, HealthProviders, RequestStats,
    ServiceStatsProvider, SystemStatsProvider, TcpHealthProvider,
};
use healer_lib::{HealerMetrics, HealingEngine};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Statistics source for a standalone deployment with no embedded
/// service; an embedded deployment supplies its own provider
struct IdleServiceStats;

impl ServiceStatsProvider for IdleServiceStats {
    fn database_stats(&self) -> DatabaseStats {
        DatabaseStats::default()
    }

    fn request_stats(&self) -> RequestStats {
        RequestStats::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting healer");

    let config = config::HealerConfig::load()?;
    info!(
        api_port = config.api_port,
        check_interval_secs = config.check_interval_secs,
        "Agent configured"
    );

    // Health probes for the monitored collaborators
    let providers = HealthProviders {
        database: Arc::new(TcpHealthProvider::new(
            "database",
            config.database_host.clone(),
            config.database_port,
            PROBE_TIMEOUT,
        )),
        cache: Arc::new(TcpHealthProvider::new(
            "cache",
            config.cache_host.clone(),
            config.cache_port,
            PROBE_TIMEOUT,
        )),
        external_api: Arc::new(TcpHealthProvider::new(
            "external_api",
            config.external_api_host.clone(),
            config.external_api_port,
            PROBE_TIMEOUT,
        )),
        custom: Arc::new(DiskHealthProvider::new("disk", config.disk_mount.clone())),
    };

    let runtime_stats = Arc::new(SystemStatsProvider::new()?);
    let monitor = HealthMonitor::new(providers, runtime_stats.clone(), Arc::new(IdleServiceStats));

    // Control handles shared by the strategies
    let database_control = Arc::new(TcpDatabaseControl::new(
        config.database_host.clone(),
        config.database_port,
        PROBE_TIMEOUT,
    ));
    let cache_control = Arc::new(CacheRegistry::new());
    let network_control = Arc::new(TcpNetworkControl::new());
    let runtime_control = Arc::new(SystemRuntimeControl::new(runtime_stats));

    let mut registry = StrategyRegistry::new();
    registry.register(Arc::new(MemoryHealingStrategy::new(
        cache_control.clone(),
        runtime_control.clone(),
    )));
    registry.register(Arc::new(DatabaseHealingStrategy::new(
        database_control.clone(),
    )));
    registry.register(Arc::new(NetworkHealingStrategy::new(
        network_control,
        config.parsed_network_endpoints(),
    )));
    registry.register(Arc::new(ApplicationHealingStrategy::new(
        cache_control.clone(),
        runtime_control.clone(),
    )));

    let metrics = Arc::new(HealerMetrics::new());

    let policy = HealingPolicy {
        cooldown: Duration::from_secs(config.healing_cooldown_secs),
        max_attempts: config.max_healing_attempts,
        stale_reset: Duration::from_secs(config.healing_cooldown_secs) * 6,
        ..HealingPolicy::default()
    };
    let dispatcher = Arc::new(HealingDispatcher::with_policy(
        Arc::new(registry),
        metrics.clone(),
        policy,
    ));

    let proactive = Arc::new(ProactiveHealer::new(
        cache_control,
        runtime_control,
        database_control,
        metrics.clone(),
    ));

    let engine = Arc::new(
        HealingEngine::new(monitor, dispatcher, proactive, metrics)
            .with_check_interval(Duration::from_secs(config.check_interval_secs)),
    );

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
    let engine_handle = tokio::spawn(engine.clone().run(shutdown_tx.subscribe()));

    let app_state = Arc::new(api::AppState::new(engine));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("SIGINT received, shutting down");

    let _ = shutdown_tx.send(());
    let _ = engine_handle.await;
    api_handle.abort();

    Ok(())
}
