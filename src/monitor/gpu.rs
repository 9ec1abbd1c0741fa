//! GPU inventory and capacity-class scoring
//!
//! One-shot `nvidia-smi` query for the installed GPUs, plus the VRAM
//! capacity class used to decide which local models a host can serve.

use std::process::Command;

use serde::Serialize;
use tracing::debug;

/// A single installed GPU.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuDevice {
    pub name: String,
    pub vram_gb: f64,
}

/// Everything the capability report needs about the host's GPUs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuInventory {
    pub devices: Vec<GpuDevice>,
    pub total_vram_gb: f64,
    pub capability: CapabilityClass,
}

impl GpuInventory {
    pub fn count(&self) -> usize {
        self.devices.len()
    }
}

/// Detect installed NVIDIA GPUs. A host without `nvidia-smi` (or without
/// GPUs) yields an empty inventory classed `no_gpu`.
pub fn detect_gpus() -> GpuInventory {
    let devices = match query_nvidia_smi() {
        Some(csv) => parse_inventory(&csv),
        None => {
            debug!("nvidia-smi unavailable, reporting no GPUs");
            Vec::new()
        }
    };

    let total_vram_gb: f64 = devices.iter().map(|d| d.vram_gb).sum();
    GpuInventory {
        capability: CapabilityClass::classify(total_vram_gb),
        devices,
        total_vram_gb,
    }
}

fn query_nvidia_smi() -> Option<String> {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=name,memory.total", "--format=csv,noheader,nounits"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `name, memory.total` CSV lines. VRAM is reported in MiB.
fn parse_inventory(csv: &str) -> Vec<GpuDevice> {
    csv.lines()
        .filter_map(|line| {
            let (name, vram_mb) = line.rsplit_once(',')?;
            let vram_mb: f64 = vram_mb.trim().parse().ok()?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(GpuDevice {
                name: name.to_string(),
                vram_gb: vram_mb / 1024.0,
            })
        })
        .collect()
}

/// VRAM capacity class for the whole host.
///
/// Boundaries leave headroom above the nominal class size (a 10 GB card
/// still serves the 8 GB model tier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CapabilityClass {
    #[serde(rename = "no_gpu")]
    NoGpu,
    #[serde(rename = "class_8GB")]
    Class8Gb,
    #[serde(rename = "class_12GB")]
    Class12Gb,
    #[serde(rename = "class_16GB")]
    Class16Gb,
    #[serde(rename = "class_24GB")]
    Class24Gb,
    #[serde(rename = "class_48GB")]
    Class48Gb,
    #[serde(rename = "class_96GB")]
    Class96Gb,
    #[serde(rename = "class_96GBplus")]
    Class96GbPlus,
}

impl CapabilityClass {
    /// Classify by total VRAM across all GPUs, in GB.
    pub fn classify(total_vram_gb: f64) -> Self {
        match total_vram_gb {
            t if t <= 0.0 => CapabilityClass::NoGpu,
            t if t <= 10.0 => CapabilityClass::Class8Gb,
            t if t <= 14.0 => CapabilityClass::Class12Gb,
            t if t <= 18.0 => CapabilityClass::Class16Gb,
            t if t <= 26.0 => CapabilityClass::Class24Gb,
            t if t <= 50.0 => CapabilityClass::Class48Gb,
            t if t <= 100.0 => CapabilityClass::Class96Gb,
            _ => CapabilityClass::Class96GbPlus,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityClass::NoGpu => "no_gpu",
            CapabilityClass::Class8Gb => "class_8GB",
            CapabilityClass::Class12Gb => "class_12GB",
            CapabilityClass::Class16Gb => "class_16GB",
            CapabilityClass::Class24Gb => "class_24GB",
            CapabilityClass::Class48Gb => "class_48GB",
            CapabilityClass::Class96Gb => "class_96GB",
            CapabilityClass::Class96GbPlus => "class_96GBplus",
        }
    }
}

impl std::fmt::Display for CapabilityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_no_gpu() {
        assert_eq!(CapabilityClass::classify(0.0), CapabilityClass::NoGpu);
        assert_eq!(CapabilityClass::classify(-1.0), CapabilityClass::NoGpu);
    }

    #[test]
    fn classify_boundaries() {
        assert_eq!(CapabilityClass::classify(8.0), CapabilityClass::Class8Gb);
        assert_eq!(CapabilityClass::classify(10.0), CapabilityClass::Class8Gb);
        assert_eq!(CapabilityClass::classify(10.5), CapabilityClass::Class12Gb);
        assert_eq!(CapabilityClass::classify(16.0), CapabilityClass::Class16Gb);
        assert_eq!(CapabilityClass::classify(24.0), CapabilityClass::Class24Gb);
        assert_eq!(CapabilityClass::classify(48.0), CapabilityClass::Class48Gb);
        assert_eq!(CapabilityClass::classify(96.0), CapabilityClass::Class96Gb);
        assert_eq!(CapabilityClass::classify(100.1), CapabilityClass::Class96GbPlus);
    }

    #[test]
    fn classify_multi_gpu_total() {
        // 2x 24 GB lands in the 48 GB class
        assert_eq!(CapabilityClass::classify(48.0), CapabilityClass::Class48Gb);
    }

    #[test]
    fn capability_serializes_with_wire_names() {
        let json = serde_json::to_value(CapabilityClass::Class96GbPlus).unwrap();
        assert_eq!(json, "class_96GBplus");
        assert_eq!(
            serde_json::to_value(CapabilityClass::NoGpu).unwrap(),
            "no_gpu"
        );
    }

    #[test]
    fn parses_inventory_csv() {
        let csv = "NVIDIA GeForce RTX 3090, 24576\nNVIDIA A100-SXM4-40GB, 40960\n";
        let devices = parse_inventory(csv);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "NVIDIA GeForce RTX 3090");
        assert!((devices[0].vram_gb - 24.0).abs() < 1e-9);
        assert!((devices[1].vram_gb - 40.0).abs() < 1e-9);
    }

    #[test]
    fn inventory_handles_names_with_commas() {
        // rsplit keeps the VRAM column even if the name contains a comma
        let csv = "Tesla, special edition, 16384\n";
        let devices = parse_inventory(csv);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "Tesla, special edition");
        assert!((devices[0].vram_gb - 16.0).abs() < 1e-9);
    }

    #[test]
    fn inventory_skips_garbage() {
        assert!(parse_inventory("").is_empty());
        assert!(parse_inventory("garbage line without comma\n").is_empty());
    }
}
