//! Host resource probes
//!
//! Thin readers over `/proc` and `nvidia-smi`. Every probe returns `Option`:
//! a missing pseudo-file (non-Linux host) or missing `nvidia-smi` (no NVIDIA
//! driver) means the sample is skipped, not an error.

use std::fs;
use std::process::Command;

/// Cumulative CPU jiffies from `/proc/stat`. Percent load is computed from
/// the delta between two readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CpuCounters {
    pub busy: u64,
    pub total: u64,
}

pub(crate) fn cpu_counters() -> Option<CpuCounters> {
    let stat = fs::read_to_string("/proc/stat").ok()?;
    parse_cpu_counters(&stat)
}

fn parse_cpu_counters(stat: &str) -> Option<CpuCounters> {
    // Aggregate line: "cpu  user nice system idle iowait irq softirq steal ..."
    let line = stat.lines().find(|line| line.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .filter_map(|f| f.parse().ok())
        .collect();
    if fields.len() < 4 {
        return None;
    }

    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    let total: u64 = fields.iter().sum();
    Some(CpuCounters {
        busy: total - idle,
        total,
    })
}

/// System-wide CPU usage percent between two counter readings.
/// `None` when no jiffies elapsed (readings taken too close together).
pub(crate) fn cpu_percent(prev: CpuCounters, cur: CpuCounters) -> Option<f64> {
    let total = cur.total.checked_sub(prev.total)?;
    if total == 0 {
        return None;
    }
    let busy = cur.busy.saturating_sub(prev.busy);
    Some(busy as f64 / total as f64 * 100.0)
}

/// RAM in use (total minus available) in GB, from `/proc/meminfo`.
pub(crate) fn ram_used_gb() -> Option<f64> {
    let meminfo = fs::read_to_string("/proc/meminfo").ok()?;
    parse_ram_used_gb(&meminfo)
}

fn parse_ram_used_gb(meminfo: &str) -> Option<f64> {
    let total_kb = meminfo_field(meminfo, "MemTotal:")?;
    let available_kb = meminfo_field(meminfo, "MemAvailable:")?;
    Some(total_kb.saturating_sub(available_kb) as f64 / (1024.0 * 1024.0))
}

fn meminfo_field(meminfo: &str, key: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|line| line.starts_with(key))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|v| v.parse().ok())
}

/// One reading across all visible GPUs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct GpuSample {
    pub count: usize,
    /// Mean utilization percent across GPUs
    pub mean_load_pct: f64,
    /// Total VRAM in use across GPUs, in GB
    pub vram_used_gb: f64,
}

pub(crate) fn gpu_sample() -> Option<GpuSample> {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=utilization.gpu,memory.used", "--format=csv,noheader,nounits"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_gpu_sample(&String::from_utf8_lossy(&output.stdout))
}

fn parse_gpu_sample(csv: &str) -> Option<GpuSample> {
    let mut count = 0usize;
    let mut load_total = 0.0;
    let mut used_mb_total = 0.0;

    for line in csv.lines() {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 2 {
            continue;
        }
        let (Ok(load), Ok(used_mb)) = (parts[0].parse::<f64>(), parts[1].parse::<f64>()) else {
            continue;
        };
        count += 1;
        load_total += load;
        used_mb_total += used_mb;
    }

    if count == 0 {
        return None;
    }
    Some(GpuSample {
        count,
        mean_load_pct: load_total / count as f64,
        vram_used_gb: used_mb_total / 1024.0,
    })
}
