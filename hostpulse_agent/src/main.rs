//! Headless reporting agent. Configuration comes from `HOSTPULSE_*`
//! environment variables; a few flags override them.

use std::{env, sync::Arc};

use hostpulse_agent::{
    config::{parse_args, Config},
    logging,
    sampler::SystemSampler,
    session::build_connector,
    status::LogStatus,
    tls, Supervisor,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const USAGE: &str = "Usage: hostpulse_agent [--url URL|-u URL] [--transport ws|http|-t ws|http] [--tls-ca CERT_PEM] [--log-file PATH] [URL]

Environment:
  HOSTPULSE_URL, HOSTPULSE_SECRET, HOSTPULSE_TRANSPORT, HOSTPULSE_REPORT_PATH,
  HOSTPULSE_INTERVAL_SECS, HOSTPULSE_BACKOFF_SECS, HOSTPULSE_HANDSHAKE_TIMEOUT_SECS,
  HOSTPULSE_CONNECT_TIMEOUT_SECS, HOSTPULSE_GPU, HOSTPULSE_GPU_TIMEOUT_MS, HOSTPULSE_TLS_CA";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = match parse_args(env::args()) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{msg}\n{USAGE}");
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    match args.log_file.as_deref() {
        Some(path) => logging::init_file(path)?,
        None => logging::init_stderr(),
    }
    tls::install_crypto_provider();

    let cfg = Config::from_env().with_overrides(&args);
    if cfg.credentials.endpoint.is_empty() {
        warn!("HOSTPULSE_URL is not set; sessions will fail until it is");
    }
    if cfg.credentials.secret.is_empty() {
        warn!("HOSTPULSE_SECRET is not set; the collector will likely reject us");
    }
    info!(
        endpoint = %cfg.credentials.endpoint,
        transport = ?cfg.transport,
        interval = ?cfg.interval,
        backoff = ?cfg.backoff,
        gpu = cfg.gpu_enabled,
        "hostpulse_agent starting"
    );

    let connector = build_connector(&cfg)?;
    let sampler = Box::new(SystemSampler::from_config(&cfg));
    let supervisor = Supervisor::from_config(&cfg, connector, sampler, Arc::new(LogStatus));

    let shutdown = CancellationToken::new();
    let task = tokio::spawn(supervisor.supervise(shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    shutdown.cancel();
    task.await?;
    Ok(())
}
