//! Data types sent to the collector and shown on the status display.
//! Keep `Sample` minimal and stable; it defines the wire format.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value put on the wire in place of a GPU reading when no GPU could be queried.
pub const GPU_UNAVAILABLE: f64 = -1.0;

/// One snapshot of host utilization.
///
/// Wire form: `{"cpu", "ram", "ramUsedMb", "ramTotalMb", "gpu"}`. An unavailable
/// GPU is `None` here and `-1` on the wire; the field is never omitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub cpu: f64,
    pub ram: f64,
    pub ram_used_mb: u64,
    pub ram_total_mb: u64,
    #[serde(with = "gpu_sentinel")]
    pub gpu: Option<f64>,
}

impl Sample {
    /// One-line summary used in logs and the status panel footer.
    pub fn summary(&self) -> String {
        let gpu = match self.gpu {
            Some(g) => format!("{g:.0}%"),
            None => "N/A".to_string(),
        };
        format!(
            "CPU: {:.1}% | RAM: {:.1}% ({} MB / {} MB) | GPU: {gpu}",
            self.cpu, self.ram, self.ram_used_mb, self.ram_total_mb
        )
    }
}

mod gpu_sentinel {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::GPU_UNAVAILABLE;

    pub fn serialize<S: Serializer>(v: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(v.unwrap_or(GPU_UNAVAILABLE))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let v = f64::deserialize(d)?;
        Ok(if v < 0.0 { None } else { Some(v) })
    }
}

/// Lifecycle of the reporting connection as seen by the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Authenticating,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Authenticating => "Authenticating...",
            ConnectionState::Connected => "Connected",
            ConnectionState::Error => "Error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Endpoint and bearer secret. Built once at startup and shared read-only.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub endpoint: String,
    pub secret: String,
}

// Keep the secret out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// First message of the streaming handshake.
#[derive(Debug, Serialize)]
pub struct AuthMessage<'a> {
    pub secret: &'a str,
}

/// Outcome of the streaming handshake reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub accepted: bool,
    pub reason: String,
}

impl AuthResult {
    /// Parse the collector's reply, a flat JSON object of strings. Only
    /// `status == "ok"` is accepted; `reason` carries the status seen.
    pub fn from_reply(text: &str) -> Result<Self, serde_json::Error> {
        let reply: std::collections::HashMap<String, String> = serde_json::from_str(text)?;
        let status = reply.get("status").cloned().unwrap_or_default();
        Ok(AuthResult {
            accepted: status == "ok",
            reason: status,
        })
    }
}
