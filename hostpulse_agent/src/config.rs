//! Process configuration: read once from the environment (optionally overridden
//! by CLI flags) and shared read-only afterwards.

use std::{path::PathBuf, time::Duration};

use tracing::warn;

use crate::types::Credentials;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_GPU_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_REPORT_PATH: &str = "metrics";

// Floor for every configurable wait so a zero never turns a loop into a spin.
pub(crate) const MIN_WAIT: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// One long-lived WebSocket with an explicit auth handshake.
    Stream,
    /// Periodic HTTP POSTs carrying a bearer header.
    Http,
}

impl TransportKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ws" | "wss" | "stream" | "websocket" => Some(TransportKind::Stream),
            "http" | "https" | "post" => Some(TransportKind::Http),
            _ => None,
        }
    }

    /// Guess from the endpoint scheme; anything unrecognized streams.
    pub fn infer(endpoint: &str) -> Self {
        match endpoint.split_once("://") {
            Some((scheme, _)) if scheme.eq_ignore_ascii_case("http") => TransportKind::Http,
            Some((scheme, _)) if scheme.eq_ignore_ascii_case("https") => TransportKind::Http,
            _ => TransportKind::Stream,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub transport: TransportKind,
    pub report_path: String,
    pub interval: Duration,
    pub backoff: Duration,
    pub handshake_timeout: Duration,
    /// Bound on the TCP/TLS dial plus the WebSocket upgrade, and on each send.
    pub connect_timeout: Duration,
    pub gpu_enabled: bool,
    pub gpu_timeout: Duration,
    pub tls_ca: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        let endpoint = get("HOSTPULSE_URL").unwrap_or_default();
        let secret = get("HOSTPULSE_SECRET").unwrap_or_default();
        let transport = match get("HOSTPULSE_TRANSPORT") {
            Some(v) => TransportKind::parse(&v).unwrap_or_else(|| {
                warn!(value = %v, "unknown HOSTPULSE_TRANSPORT, inferring from URL");
                TransportKind::infer(&endpoint)
            }),
            None => TransportKind::infer(&endpoint),
        };

        Config {
            transport,
            report_path: get("HOSTPULSE_REPORT_PATH").unwrap_or_else(|| DEFAULT_REPORT_PATH.into()),
            interval: secs(get("HOSTPULSE_INTERVAL_SECS"), "HOSTPULSE_INTERVAL_SECS", DEFAULT_INTERVAL),
            backoff: secs(get("HOSTPULSE_BACKOFF_SECS"), "HOSTPULSE_BACKOFF_SECS", DEFAULT_BACKOFF),
            handshake_timeout: secs(
                get("HOSTPULSE_HANDSHAKE_TIMEOUT_SECS"),
                "HOSTPULSE_HANDSHAKE_TIMEOUT_SECS",
                DEFAULT_HANDSHAKE_TIMEOUT,
            ),
            connect_timeout: secs(
                get("HOSTPULSE_CONNECT_TIMEOUT_SECS"),
                "HOSTPULSE_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT,
            ),
            gpu_enabled: get("HOSTPULSE_GPU").map(|v| v != "0").unwrap_or(true),
            gpu_timeout: millis(get("HOSTPULSE_GPU_TIMEOUT_MS"), "HOSTPULSE_GPU_TIMEOUT_MS", DEFAULT_GPU_TIMEOUT),
            tls_ca: get("HOSTPULSE_TLS_CA").map(PathBuf::from),
            credentials: Credentials { endpoint, secret },
        }
    }

    /// Apply CLI overrides on top of the environment.
    pub fn with_overrides(mut self, args: &CliOverrides) -> Self {
        if let Some(url) = &args.url {
            self.credentials.endpoint = url.clone();
            if args.transport.is_none() {
                self.transport = TransportKind::infer(url);
            }
        }
        if let Some(t) = args.transport {
            self.transport = t;
        }
        if let Some(ca) = &args.tls_ca {
            self.tls_ca = Some(ca.clone());
        }
        self
    }
}

fn secs(raw: Option<String>, key: &str, default: Duration) -> Duration {
    parse_or(raw, key, default, Duration::from_secs)
}

fn millis(raw: Option<String>, key: &str, default: Duration) -> Duration {
    parse_or(raw, key, default, Duration::from_millis)
}

fn parse_or(raw: Option<String>, key: &str, default: Duration, unit: fn(u64) -> Duration) -> Duration {
    let Some(raw) = raw else { return default };
    match raw.trim().parse::<u64>() {
        Ok(n) => unit(n).max(MIN_WAIT),
        Err(_) => {
            warn!(key, value = %raw, "not a whole number, using default");
            default
        }
    }
}

/// Flags shared by both binaries.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CliOverrides {
    pub url: Option<String>,
    pub transport: Option<TransportKind>,
    pub tls_ca: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub help: bool,
}

/// Parse `--url/-u`, `--transport/-t`, `--tls-ca`, `--log-file`, `--help/-h`.
/// The first element is the program name. A bare positional is taken as the URL.
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<CliOverrides, String> {
    let mut it = args.into_iter();
    let _ = it.next();
    let mut out = CliOverrides::default();

    while let Some(arg) = it.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            inline
                .clone()
                .or_else(|| it.next())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| format!("{name} expects a value"))
        };
        match flag.as_str() {
            "-h" | "--help" => out.help = true,
            "-u" | "--url" => out.url = Some(value("--url")?),
            "-t" | "--transport" => {
                let v = value("--transport")?;
                out.transport =
                    Some(TransportKind::parse(&v).ok_or_else(|| format!("unknown transport: {v}"))?);
            }
            "--tls-ca" => out.tls_ca = Some(PathBuf::from(value("--tls-ca")?)),
            "--log-file" => out.log_file = Some(PathBuf::from(value("--log-file")?)),
            _ if !arg.starts_with('-') && out.url.is_none() => out.url = Some(arg),
            _ => return Err(format!("unexpected argument: {arg}")),
        }
    }
    Ok(out)
}
