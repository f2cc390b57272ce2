//! Sampler: turns sysinfo readings plus a GPU probe into a `Sample`.
//! Never fails; an unavailable GPU only blanks the GPU field.

use async_trait::async_trait;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use crate::config::Config;
use crate::gpu::{GpuProbe, NoGpu, NvidiaSmiProbe};
use crate::types::Sample;

const MB: u64 = 1024 * 1024;

#[async_trait]
pub trait Sampler: Send {
    async fn sample(&mut self) -> Sample;
}

pub struct SystemSampler {
    sys: System,
    gpu: Box<dyn GpuProbe>,
    primed: bool,
}

impl SystemSampler {
    pub fn new(gpu: Box<dyn GpuProbe>) -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());
        Self {
            sys: System::new_with_specifics(refresh_kind),
            gpu,
            primed: false,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let gpu: Box<dyn GpuProbe> = if cfg.gpu_enabled {
            Box::new(NvidiaSmiProbe::new(cfg.gpu_timeout))
        } else {
            Box::new(NoGpu)
        };
        Self::new(gpu)
    }
}

#[async_trait]
impl Sampler for SystemSampler {
    async fn sample(&mut self) -> Sample {
        // CPU usage is a delta between two refreshes; the first call needs a baseline.
        if !self.primed {
            self.sys.refresh_cpu_usage();
            tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
            self.primed = true;
        }
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();

        let gpu = self.gpu.utilization().await;
        build_sample(
            self.sys.global_cpu_usage() as f64,
            self.sys.used_memory(),
            self.sys.total_memory(),
            gpu,
        )
    }
}

/// Assemble a sample from raw readings (memory in bytes), clamping percentages.
pub fn build_sample(cpu: f64, used_bytes: u64, total_bytes: u64, gpu: Option<f64>) -> Sample {
    let ram = if total_bytes > 0 {
        used_bytes as f64 / total_bytes as f64 * 100.0
    } else {
        0.0
    };
    Sample {
        cpu: clamp_pct(cpu),
        ram: clamp_pct(ram),
        ram_used_mb: used_bytes / MB,
        ram_total_mb: total_bytes / MB,
        gpu: gpu.map(clamp_pct),
    }
}

fn clamp_pct(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
