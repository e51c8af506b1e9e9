//! Agent configuration

use anyhow::Result;
use serde::Deserialize;

/// Healing-agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HealerConfig {
    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Monitoring cycle interval in seconds
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Minimum gap between healing attempts for one issue type, in seconds
    #[serde(default = "default_healing_cooldown")]
    pub healing_cooldown_secs: u64,

    /// Consecutive failures before an issue type stops being dispatched
    #[serde(default = "default_max_healing_attempts")]
    pub max_healing_attempts: u32,

    /// Monitored database endpoint
    #[serde(default = "default_database_host")]
    pub database_host: String,
    #[serde(default = "default_database_port")]
    pub database_port: u16,

    /// Monitored cache endpoint
    #[serde(default = "default_cache_host")]
    pub cache_host: String,
    #[serde(default = "default_cache_port")]
    pub cache_port: u16,

    /// Monitored downstream API endpoint
    #[serde(default = "default_external_api_host")]
    pub external_api_host: String,
    #[serde(default = "default_external_api_port")]
    pub external_api_port: u16,

    /// Filesystem watched for disk pressure
    #[serde(default = "default_disk_mount")]
    pub disk_mount: String,

    /// Endpoints probed to verify network recovery, "host:port" separated
    /// by commas
    #[serde(default = "default_network_endpoints")]
    pub network_endpoints: String,
}

fn default_api_port() -> u16 {
    8080
}

fn default_check_interval() -> u64 {
    30
}

fn default_healing_cooldown() -> u64 {
    300
}

fn default_max_healing_attempts() -> u32 {
    3
}

fn default_database_host() -> String {
    "localhost".to_string()
}

fn default_database_port() -> u16 {
    5432
}

fn default_cache_host() -> String {
    "localhost".to_string()
}

fn default_cache_port() -> u16 {
    6379
}

fn default_external_api_host() -> String {
    "localhost".to_string()
}

fn default_external_api_port() -> u16 {
    8081
}

fn default_disk_mount() -> String {
    "/".to_string()
}

fn default_network_endpoints() -> String {
    "8.8.8.8:53,1.1.1.1:53".to_string()
}

impl HealerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("HEALER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| HealerConfig {
            api_port: default_api_port(),
            check_interval_secs: default_check_interval(),
            healing_cooldown_secs: default_healing_cooldown(),
            max_healing_attempts: default_max_healing_attempts(),
            database_host: default_database_host(),
            database_port: default_database_port(),
            cache_host: default_cache_host(),
            cache_port: default_cache_port(),
            external_api_host: default_external_api_host(),
            external_api_port: default_external_api_port(),
            disk_mount: default_disk_mount(),
            network_endpoints: default_network_endpoints(),
        }))
    }

    /// Parse the configured "host:port" endpoint list, skipping entries
    /// that do not parse
    pub fn parsed_network_endpoints(&self) -> Vec<(String, u16)> {
        self.network_endpoints
            .split(',')
            .filter_map(|entry| {
                let entry = entry.trim();
                let (host, port) = entry.rsplit_once(':')?;
                let port = port.parse().ok()?;
                Some((host.to_string(), port))
            })
            .collect()
    }
}
