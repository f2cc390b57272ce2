//! Status display contract and the lock-guarded state behind it.
//!
//! The supervisor and session push updates through [`StatusSink`]; front ends
//! read a consistent [`StatusSnapshot`] from a [`StatusBoard`]. The lock is held
//! only for the field update or the copy-out, never across I/O.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::TerminalError;
use crate::types::{ConnectionState, Sample};

/// Receiver of fire-and-forget status pushes. Implementations must not block
/// meaningfully and must not fail.
pub trait StatusSink: Send + Sync {
    fn on_metrics(&self, sample: &Sample);
    fn on_connection_state(&self, state: ConnectionState);
    fn on_error(&self, _err: &TerminalError) {}
}

/// Everything a front end renders, copied out under one lock acquisition.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    pub last_sample: Option<Sample>,
    pub last_sample_at: Option<DateTime<Local>>,
    pub last_error: Option<String>,
    pub attempts: u64,
}

/// Menu text derived from a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLines {
    pub cpu: String,
    pub ram: String,
    pub gpu: String,
    pub status: String,
}

impl StatusSnapshot {
    pub fn menu_lines(&self) -> MenuLines {
        let (cpu, ram, gpu) = match &self.last_sample {
            Some(s) => (
                format!("CPU: {:.1}%", s.cpu),
                format!("RAM: {:.1}% ({} MB / {} MB)", s.ram, s.ram_used_mb, s.ram_total_mb),
                match s.gpu {
                    Some(g) => format!("GPU: {g:.0}%"),
                    None => "GPU: N/A".to_string(),
                },
            ),
            None => (
                "CPU: --".to_string(),
                "RAM: --".to_string(),
                "GPU: --".to_string(),
            ),
        };
        let status = match (self.state, &self.last_error) {
            (state @ (ConnectionState::Error | ConnectionState::Disconnected), Some(e)) => {
                format!("Status: {state} ({e})")
            }
            (state, _) => format!("Status: {state}"),
        };
        MenuLines { cpu, ram, gpu, status }
    }
}

/// Shared, cloneable handle to the display state.
#[derive(Clone, Default)]
pub struct StatusBoard {
    inner: Arc<Mutex<StatusSnapshot>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock().clone()
    }

    // A panic elsewhere must not take the display down with it.
    fn lock(&self) -> MutexGuard<'_, StatusSnapshot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StatusSink for StatusBoard {
    fn on_metrics(&self, sample: &Sample) {
        let mut s = self.lock();
        s.last_sample = Some(*sample);
        s.last_sample_at = Some(Local::now());
    }

    fn on_connection_state(&self, state: ConnectionState) {
        let mut s = self.lock();
        if state == ConnectionState::Connecting {
            s.attempts += 1;
        }
        if state == ConnectionState::Connected {
            s.last_error = None;
        }
        s.state = state;
    }

    fn on_error(&self, err: &TerminalError) {
        self.lock().last_error = Some(err.to_string());
    }
}

/// Headless sink: state transitions go to the log.
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn on_metrics(&self, _sample: &Sample) {}

    fn on_connection_state(&self, state: ConnectionState) {
        info!(%state, "connection state");
    }
}
