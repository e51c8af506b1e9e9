//! Concrete health and statistics providers
//!
//! TCP reachability probes for the database/cache/external-API slots, a
//! disk-space probe for the custom slot, and a sysinfo-backed runtime
//! statistics provider.

use super::{HealthProvider, ProbeReport, RuntimeStats, RuntimeStatsProvider};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use sysinfo::{Disks, Pid, System};
use tokio::net::TcpStream;

/// Default disk usage fraction above which the probe reports Down
const DISK_DOWN_THRESHOLD: f64 = 0.9;

/// Probes a collaborator by opening a TCP connection with a bounded timeout
pub struct TcpHealthProvider {
    name: String,
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpHealthProvider {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            timeout,
        }
    }
}

#[async_trait]
impl HealthProvider for TcpHealthProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> ProbeReport {
        let addr = format!("{}:{}", self.host, self.port);
        let start = Instant::now();

        match tokio::time::timeout(self.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_)) => ProbeReport::up()
                .with_detail("endpoint", &addr)
                .with_detail("latency_ms", start.elapsed().as_millis().to_string()),
            Ok(Err(e)) => ProbeReport::down(e.to_string()).with_detail("endpoint", addr),
            Err(_) => ProbeReport::error("connect timed out").with_detail("endpoint", addr),
        }
    }
}

/// Probe that always returns a fixed report, for unconfigured slots and tests
pub struct StaticHealthProvider {
    name: String,
    report: ProbeReport,
}

impl StaticHealthProvider {
    pub fn new(name: impl Into<String>, report: ProbeReport) -> Self {
        Self {
            name: name.into(),
            report,
        }
    }
}

#[async_trait]
impl HealthProvider for StaticHealthProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> ProbeReport {
        self.report.clone()
    }
}

/// Disk-space probe for the custom health slot
///
/// Reports the usage fraction of the disk mounted at the configured path
/// and goes Down above the threshold.
pub struct DiskHealthProvider {
    name: String,
    mount_point: PathBuf,
    down_threshold: f64,
}

impl DiskHealthProvider {
    pub fn new(name: impl Into<String>, mount_point: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            mount_point: mount_point.into(),
            down_threshold: DISK_DOWN_THRESHOLD,
        }
    }
}

#[async_trait]
impl HealthProvider for DiskHealthProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> ProbeReport {
        let mount = self.mount_point.clone();
        let usage = tokio::task::spawn_blocking(move || {
            let disks = Disks::new_with_refreshed_list();
            let disk = disks
                .list()
                .iter()
                .find(|d| d.mount_point() == mount)
                .or_else(|| disks.list().first())?;

            let total = disk.total_space();
            if total == 0 {
                return None;
            }
            let used = total.saturating_sub(disk.available_space());
            Some((used as f64 / total as f64, disk.available_space(), total))
        })
        .await;

        match usage {
            Ok(Some((fraction, free, total))) => {
                let report = if fraction > self.down_threshold {
                    ProbeReport::down("disk usage above threshold")
                } else {
                    ProbeReport::up()
                };
                report
                    .with_detail("disk_usage", format!("{:.4}", fraction))
                    .with_detail("free_bytes", free.to_string())
                    .with_detail("total_bytes", total.to_string())
            }
            Ok(None) => ProbeReport::error("no disk found for mount point"),
            Err(e) => ProbeReport::error(e.to_string()),
        }
    }
}

/// Runtime statistics backed by sysinfo plus `/proc/self/status`
///
/// There is no collector in this runtime; the GC figures stay at zero
/// unless a different provider implementation reports them.
pub struct SystemStatsProvider {
    system: Mutex<System>,
    pid: Pid,
    started_at: Instant,
}

impl SystemStatsProvider {
    pub fn new() -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| anyhow!("pid lookup failed: {e}"))?;
        Ok(Self {
            system: Mutex::new(System::new()),
            pid,
            started_at: Instant::now(),
        })
    }
}

#[async_trait]
impl RuntimeStatsProvider for SystemStatsProvider {
    async fn stats(&self) -> Result<RuntimeStats> {
        let (heap_used, virt, heap_max, cpu_load) = {
            let mut sys = self
                .system
                .lock()
                .map_err(|_| anyhow!("stats lock poisoned"))?;
            sys.refresh_memory();
            sys.refresh_cpu_usage();
            sys.refresh_process(self.pid);

            let (rss, virt, cpu_percent) = sys
                .process(self.pid)
                .map(|p| (p.memory(), p.virtual_memory(), p.cpu_usage()))
                .unwrap_or((0, 0, 0.0));

            let cores = sys.cpus().len().max(1);
            let cpu_load = (cpu_percent as f64 / 100.0 / cores as f64).clamp(0.0, 1.0);

            (rss, virt, sys.total_memory(), cpu_load)
        };

        let status = tokio::fs::read_to_string("/proc/self/status")
            .await
            .unwrap_or_default();
        let thread_count = parse_thread_count(&status).unwrap_or(0);

        Ok(RuntimeStats {
            heap_used_bytes: heap_used,
            heap_max_bytes: heap_max,
            non_heap_used_bytes: virt.saturating_sub(heap_used),
            non_heap_max_bytes: 0,
            gc_count: 0,
            gc_time_ms: 0,
            process_cpu_load: cpu_load,
            thread_count,
            load_average: System::load_average().one,
            uptime_ms: self.started_at.elapsed().as_millis() as u64,
        })
    }
}

/// Parse the `Threads:` line from `/proc/self/status` contents
fn parse_thread_count(status: &str) -> Option<usize> {
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("Threads:") {
            return rest.trim().parse().ok();
        }
    }
    None
}
