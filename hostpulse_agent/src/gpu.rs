//! GPU utilization probes. The default asks `nvidia-smi`; every failure mode
//! (missing binary, non-zero exit, garbage output, timeout) reads as "no GPU".

use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

#[async_trait]
pub trait GpuProbe: Send + Sync {
    /// Current utilization in percent, or `None` when unavailable.
    async fn utilization(&self) -> Option<f64>;
}

/// Queries NVIDIA devices through the vendor CLI, bounded by a timeout.
pub struct NvidiaSmiProbe {
    program: String,
    timeout: Duration,
}

impl NvidiaSmiProbe {
    pub fn new(timeout: Duration) -> Self {
        Self::with_program("nvidia-smi", timeout)
    }

    /// Point at another executable; used by tests to stand in for the vendor tool.
    pub fn with_program(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl GpuProbe for NvidiaSmiProbe {
    async fn utilization(&self) -> Option<f64> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["--query-gpu=utilization.gpu", "--format=csv,noheader,nounits"])
            .stdin(Stdio::null())
            .kill_on_drop(true);
        let child = cmd.output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(out)) if out.status.success() => out,
            Ok(Ok(out)) => {
                debug!(status = %out.status, "gpu query exited unsuccessfully");
                return None;
            }
            Ok(Err(e)) => {
                debug!(error = %e, program = %self.program, "gpu query could not run");
                return None;
            }
            Err(_) => {
                debug!(timeout = ?self.timeout, "gpu query timed out");
                return None;
            }
        };

        parse_utilization(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Always reports "no GPU". Used when the probe is disabled.
pub struct NoGpu;

#[async_trait]
impl GpuProbe for NoGpu {
    async fn utilization(&self) -> Option<f64> {
        None
    }
}

/// One value per device, one device per line. Multi-GPU hosts report the mean
/// of the lines that parse.
pub fn parse_utilization(stdout: &str) -> Option<f64> {
    let vals: Vec<f64> = stdout
        .lines()
        .filter_map(|l| l.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .collect();
    if vals.is_empty() {
        return None;
    }
    let mean = vals.iter().sum::<f64>() / vals.len() as f64;
    Some(mean.min(100.0))
}
