//! # System Load Monitoring
//!
//! Background sampling of host resource usage during an inference run.
//!
//! A [`LoadMonitor`] brackets one inference session: `start()` spawns a
//! sampler thread that polls CPU, RAM, and GPU usage at a fixed interval and
//! folds each reading into running maxima; `stop()` joins the sampler and
//! produces a [`UsageReport`]. The maxima live behind a single lock with the
//! sampler as the only writer, and every update is a monotonic max-write, so
//! snapshots taken mid-session never regress.
//!
//! The optional `stop_inference_timer()` call splits the session clock into
//! inference time (model generation) and tool time (validation fan-out).

mod gpu;
mod probe;

pub use gpu::{detect_gpus, CapabilityClass, GpuDevice, GpuInventory};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

use crate::error::SupportError;

/// Default sampling interval (matches the pipeline's 2-second cadence)
const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(2);

/// Running maxima over one monitoring session. All updates are max-folds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageMaxima {
    /// Peak system-wide CPU usage, percent
    pub max_cpu_pct: f64,
    /// Peak RAM in use, GB
    pub max_ram_gb: f64,
    /// Peak mean GPU utilization, percent
    pub max_gpu_load_pct: f64,
    /// Peak VRAM in use across all GPUs, GB
    pub max_vram_gb: f64,
    /// GPUs seen by the sampler
    pub gpu_count: usize,
}

impl UsageMaxima {
    fn observe_cpu(&mut self, pct: f64) {
        self.max_cpu_pct = self.max_cpu_pct.max(pct);
    }

    fn observe_ram(&mut self, used_gb: f64) {
        self.max_ram_gb = self.max_ram_gb.max(used_gb);
    }

    fn observe_gpu(&mut self, count: usize, mean_load_pct: f64, vram_used_gb: f64) {
        self.gpu_count = count;
        self.max_gpu_load_pct = self.max_gpu_load_pct.max(mean_load_pct);
        self.max_vram_gb = self.max_vram_gb.max(vram_used_gb);
    }
}

/// State shared with the sampler thread. The sampler is the single writer;
/// `snapshot()` and `stop()` only read.
struct MonitorShared {
    stop: AtomicBool,
    maxima: RwLock<UsageMaxima>,
}

/// Flat usage report for one inference session.
///
/// Field names match the keys downstream run reporting stores.
#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub inference_time_s: f64,
    pub tool_time_s: f64,
    pub max_cpu: f64,
    pub max_ram_gb: f64,
    pub current_time: String,
    pub n_gpus: usize,
    pub total_gpu_vram_gb: f64,
    pub capability_score: CapabilityClass,
    pub max_gpu_load: f64,
    pub max_gpu_vram_gb: f64,
}

/// Samples host load on a background thread and reports session maxima.
pub struct LoadMonitor {
    interval: Duration,
    shared: Arc<MonitorShared>,
    sampler: Option<JoinHandle<()>>,
    started_at: Option<Instant>,
    inference_time: Option<Duration>,
    tool_started_at: Option<Instant>,
}

impl LoadMonitor {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_SAMPLE_INTERVAL)
    }

    /// Create with a custom sampling interval (tests use a short one).
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            shared: Arc::new(MonitorShared {
                stop: AtomicBool::new(false),
                maxima: RwLock::new(UsageMaxima::default()),
            }),
            sampler: None,
            started_at: None,
            inference_time: None,
            tool_started_at: None,
        }
    }

    /// Start a monitoring session: resets the maxima and spawns the sampler.
    pub fn start(&mut self) -> Result<(), SupportError> {
        if self.sampler.is_some() {
            return Err(SupportError::MonitorAlreadyRunning);
        }

        // Fresh shared state per session so a reused monitor starts from zero
        self.shared = Arc::new(MonitorShared {
            stop: AtomicBool::new(false),
            maxima: RwLock::new(UsageMaxima::default()),
        });
        self.started_at = Some(Instant::now());
        self.inference_time = None;
        self.tool_started_at = None;

        let shared = Arc::clone(&self.shared);
        let interval = self.interval;
        self.sampler = Some(thread::spawn(move || sample_loop(&shared, interval)));
        Ok(())
    }

    /// Mark the end of model generation: everything after this until `stop()`
    /// is attributed to the validation tools.
    pub fn stop_inference_timer(&mut self) -> Result<(), SupportError> {
        let started_at = self.started_at.ok_or(SupportError::MonitorNotRunning)?;
        self.inference_time = Some(started_at.elapsed());
        self.tool_started_at = Some(Instant::now());
        Ok(())
    }

    /// Current maxima. Safe to call while the sampler is running.
    pub fn snapshot(&self) -> UsageMaxima {
        *self.shared.maxima.read()
    }

    /// Stop the sampler (flag + join) and build the session report.
    pub fn stop(&mut self) -> Result<UsageReport, SupportError> {
        let sampler = self.sampler.take().ok_or(SupportError::MonitorNotRunning)?;
        let started_at = self.started_at.take().ok_or(SupportError::MonitorNotRunning)?;

        self.shared.stop.store(true, Ordering::Relaxed);
        sampler.join().map_err(|_| SupportError::MonitorPanicked)?;

        // Without an explicit bracket the whole session counts as inference
        let inference_time = self.inference_time.take().unwrap_or_else(|| started_at.elapsed());
        let tool_time = self
            .tool_started_at
            .take()
            .map(|t| t.elapsed())
            .unwrap_or_default();

        let maxima = *self.shared.maxima.read();
        let inventory = detect_gpus();

        let report = UsageReport {
            inference_time_s: round2(inference_time.as_secs_f64()),
            tool_time_s: round2(tool_time.as_secs_f64()),
            max_cpu: round2(maxima.max_cpu_pct),
            max_ram_gb: round2(maxima.max_ram_gb),
            current_time: chrono::Local::now().format("%Y_%m_%dT%H_%M_%S").to_string(),
            n_gpus: maxima.gpu_count,
            total_gpu_vram_gb: round2(inventory.total_vram_gb),
            capability_score: inventory.capability,
            max_gpu_load: round2(maxima.max_gpu_load_pct),
            max_gpu_vram_gb: round2(maxima.max_vram_gb),
        };

        info!(inference_time_s = report.inference_time_s, "inference time");
        info!(tool_time_s = report.tool_time_s, "tool time");
        info!(max_cpu = report.max_cpu, "max CPU usage (%)");
        info!(max_ram_gb = report.max_ram_gb, "max RAM usage (GB)");
        if report.n_gpus > 0 {
            info!(max_gpu_load = report.max_gpu_load, "max GPU load (%)");
            info!(max_gpu_vram_gb = report.max_gpu_vram_gb, "max GPU memory (GB)");
        }

        Ok(report)
    }

    /// Whether a sampler thread is currently running.
    pub fn is_running(&self) -> bool {
        self.sampler.is_some()
    }
}

impl Default for LoadMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LoadMonitor {
    fn drop(&mut self) {
        // Don't leave a detached sampler behind if stop() was never called
        if let Some(sampler) = self.sampler.take() {
            self.shared.stop.store(true, Ordering::Relaxed);
            let _ = sampler.join();
        }
    }
}

fn sample_loop(shared: &MonitorShared, interval: Duration) {
    let mut cpu_baseline = probe::cpu_counters();

    while !shared.stop.load(Ordering::Relaxed) {
        if let Some(sample) = probe::gpu_sample() {
            shared
                .maxima
                .write()
                .observe_gpu(sample.count, sample.mean_load_pct, sample.vram_used_gb);
        }

        if let Some(used_gb) = probe::ram_used_gb() {
            shared.maxima.write().observe_ram(used_gb);
        }

        if let Some(current) = probe::cpu_counters() {
            if let Some(pct) = cpu_baseline.and_then(|prev| probe::cpu_percent(prev, current)) {
                shared.maxima.write().observe_cpu(pct);
            }
            cpu_baseline = Some(current);
        }

        thread::sleep(interval);
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
