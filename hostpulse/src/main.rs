//! Entry point for the hostpulse status panel. Reports in the background and
//! shows the latest sample and connection state until the user quits.

mod app;
mod ui;

use std::{env, sync::Arc, time::Duration};

use app::App;
use hostpulse_agent::{
    config::{parse_args, Config},
    logging,
    sampler::SystemSampler,
    session::build_connector,
    tls, StatusBoard, Supervisor,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const USAGE: &str = "Usage: hostpulse [--url URL|-u URL] [--transport ws|http|-t ws|http] [--tls-ca CERT_PEM] [--log-file PATH] [URL]

Reads HOSTPULSE_* environment variables (see hostpulse_agent --help).
Logs go to --log-file, or hostpulse.log in the temp directory.";

// How long Quit waits for the reporter to publish its final state.
const STOP_GRACE: Duration = Duration::from_secs(2);

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

    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| env::temp_dir().join("hostpulse.log"));
    logging::init_file(&log_path)?;
    tls::install_crypto_provider();

    let cfg = Config::from_env().with_overrides(&args);
    info!(endpoint = %cfg.credentials.endpoint, transport = ?cfg.transport, "hostpulse starting");

    let board = StatusBoard::new();
    let connector = build_connector(&cfg)?;
    let sampler = Box::new(SystemSampler::from_config(&cfg));
    let supervisor = Supervisor::from_config(&cfg, connector, sampler, Arc::new(board.clone()));

    let shutdown = CancellationToken::new();
    let reporter = tokio::spawn(supervisor.supervise(shutdown.clone()));

    let mut app = App::new(board, cfg.credentials.endpoint.clone());
    let res = app.run().await;

    shutdown.cancel();
    // An in-flight POST or dial is abandoned if it outlives the grace period.
    join_reporter(reporter, STOP_GRACE).await;
    info!("hostpulse stopped");
    res
}

/// Waits up to `grace` for the reporter. Returns false (after logging why) if it
/// panicked or is still running.
async fn join_reporter(reporter: JoinHandle<()>, grace: Duration) -> bool {
    match tokio::time::timeout(grace, reporter).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "reporter task failed");
            false
        }
        Err(_) => {
            warn!("reporter did not stop within {:?}, abandoning it", grace);
            false
        }
    }
}
