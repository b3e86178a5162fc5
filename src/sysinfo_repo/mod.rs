// Host metrics via sysinfo

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use sysinfo::{Disks, System};
use tracing::instrument;

use crate::models::HostMetrics;

/// Reads the local host's resource counters once per tick.
#[async_trait]
pub trait HostMetricsSource: Send + Sync {
    async fn read(&self) -> anyhow::Result<HostMetrics>;
}

pub struct SysinfoRepo {
    sys: Arc<Mutex<System>>,
    disks: Arc<Mutex<Disks>>,
    last_cpu_refresh: Arc<Mutex<Option<(Instant, f64)>>>,
    label: String,
}

impl Default for SysinfoRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoRepo {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let disks = Disks::new_with_refreshed_list();
        let label = describe_host(&sys);
        Self {
            sys: Arc::new(Mutex::new(sys)),
            disks: Arc::new(Mutex::new(disks)),
            last_cpu_refresh: Arc::new(Mutex::new(None)),
            label,
        }
    }

    /// Static description: CPU model, core counts, OS and architecture.
    pub fn label(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl HostMetricsSource for SysinfoRepo {
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "read_host_metrics"))]
    async fn read(&self) -> anyhow::Result<HostMetrics> {
        let sys = self.sys.clone();
        let disks = self.disks.clone();
        let last_cpu_refresh = self.last_cpu_refresh.clone();
        let label = self.label.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            let cpu_percent = cpu_percent(&mut sys, &last_cpu_refresh);

            sys.refresh_memory();
            let memory_percent = percent(
                sys.total_memory().saturating_sub(sys.available_memory()),
                sys.total_memory(),
            );
            drop(sys);

            let mut disks = disks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
            disks.refresh(false);
            let disk_percent = root_disk_percent(&disks)
                .ok_or_else(|| anyhow::anyhow!("no disks reported"))?;

            Ok(HostMetrics {
                cpu_percent,
                memory_percent,
                disk_percent,
                label,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}

/// Global CPU usage, refreshed at most once per MINIMUM_CPU_UPDATE_INTERVAL.
fn cpu_percent(sys: &mut System, last_cpu_refresh: &Mutex<Option<(Instant, f64)>>) -> f64 {
    let now = Instant::now();
    let usage = match last_cpu_refresh.lock() {
        Ok(mut guard) => match *guard {
            Some((prev_ts, prev_usage))
                if now.duration_since(prev_ts) < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL =>
            {
                prev_usage
            }
            Some(_) => {
                sys.refresh_cpu_all();
                let usage = sys.global_cpu_usage() as f64;
                *guard = Some((now, usage));
                usage
            }
            None => {
                // First call only establishes the baseline.
                sys.refresh_cpu_all();
                *guard = Some((now, 0.0));
                0.0
            }
        },
        Err(_) => {
            sys.refresh_cpu_all();
            0.0
        }
    };
    usage.clamp(0.0, 100.0)
}

/// Usage of the filesystem mounted at `/`, or of the largest disk when there is none.
fn root_disk_percent(disks: &Disks) -> Option<f64> {
    let list = disks.list();
    let disk = list
        .iter()
        .find(|d| d.mount_point() == std::path::Path::new("/"))
        .or_else(|| list.iter().max_by_key(|d| d.total_space()))?;
    let total = disk.total_space();
    Some(percent(total.saturating_sub(disk.available_space()), total))
}

fn percent(used: u64, total: u64) -> f64 {
    if total > 0 {
        (used as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// First "model name" in /proc/cpuinfo; sysinfo reports "cpu0" on some ARM boards.
fn cpu_model_from_proc() -> Option<String> {
    if !cfg!(target_os = "linux") {
        return None;
    }
    let content = std::fs::read_to_string("/proc/cpuinfo").ok()?;
    content
        .lines()
        .filter(|line| line.starts_with("model name"))
        .find_map(|line| line.split_once(':').map(|(_, v)| v.trim().to_string()))
        .filter(|name| !name.is_empty() && name != "cpu0")
}

fn describe_host(sys: &System) -> String {
    let cpu = cpu_model_from_proc()
        .or_else(|| {
            sys.cpus()
                .first()
                .map(|c| c.brand().trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "Unknown CPU".into());
    let logical = sys.cpus().len();
    let cores = match System::physical_core_count() {
        Some(physical) => format!(" ({}C/{}T)", physical, logical),
        None => String::new(),
    };
    let os = System::name().unwrap_or_else(|| std::env::consts::OS.into());
    format!("{}{} • {} {}", cpu, cores, os, std::env::consts::ARCH)
}
