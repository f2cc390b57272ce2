//! Keeps one session alive for the life of the process: run, and on any
//! terminal error publish it, wait the fixed backoff, run again. Only the
//! shutdown token stops it.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, MIN_WAIT};
use crate::error::{ErrorKind, TerminalError};
use crate::sampler::Sampler;
use crate::session::{Connector, Session};
use crate::status::StatusSink;
use crate::types::{ConnectionState, Credentials};

pub struct Supervisor {
    credentials: Arc<Credentials>,
    connector: Box<dyn Connector>,
    sampler: Box<dyn Sampler>,
    status: Arc<dyn StatusSink>,
    interval: Duration,
    backoff: Duration,
}

impl Supervisor {
    pub fn new(
        credentials: Arc<Credentials>,
        connector: Box<dyn Connector>,
        sampler: Box<dyn Sampler>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            credentials,
            connector,
            sampler,
            status,
            interval: crate::config::DEFAULT_INTERVAL,
            backoff: crate::config::DEFAULT_BACKOFF,
        }
    }

    pub fn from_config(
        cfg: &Config,
        connector: Box<dyn Connector>,
        sampler: Box<dyn Sampler>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self::new(Arc::new(cfg.credentials.clone()), connector, sampler, status)
            .with_timing(cfg.interval, cfg.backoff)
    }

    /// Zero waits are raised to 1 ms.
    pub fn with_timing(mut self, interval: Duration, backoff: Duration) -> Self {
        self.interval = interval.max(MIN_WAIT);
        self.backoff = backoff.max(MIN_WAIT);
        self
    }

    /// Returns only once `shutdown` is cancelled, after publishing `Disconnected`.
    pub async fn supervise(mut self, shutdown: CancellationToken) {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            self.status.on_connection_state(ConnectionState::Connecting);
            info!(attempt, endpoint = %self.credentials.endpoint, "starting session");

            let session = Session::new(
                self.connector.as_ref(),
                self.sampler.as_mut(),
                self.status.as_ref(),
                self.interval,
            );
            match session.run(&self.credentials, &shutdown).await {
                Ok(()) => break,
                Err(e) => self.report(&e),
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.backoff) => {}
            }
        }
        self.status.on_connection_state(ConnectionState::Disconnected);
        info!("supervisor stopped");
    }

    fn report(&self, e: &TerminalError) {
        warn!(error = %e, kind = ?e.kind(), "session ended, reconnecting in {:?}", self.backoff);
        self.status.on_error(e);
        self.status.on_connection_state(state_after(e.kind()));
    }
}

/// Transport trouble reads as disconnected; a rejected or garbled handshake is
/// an error the operator has to fix.
pub fn state_after(kind: ErrorKind) -> ConnectionState {
    match kind {
        ErrorKind::DialFailure | ErrorKind::SendFailure => ConnectionState::Disconnected,
        ErrorKind::AuthFailure | ErrorKind::AuthProtocolError => ConnectionState::Error,
    }
}
