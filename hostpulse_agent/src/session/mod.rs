//! One reporting session: dial, authenticate, then push a sample every
//! interval until something breaks. No retries happen here; the supervisor
//! decides what to do with the returned error.

pub mod http;
pub mod ws;

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{Config, TransportKind, MIN_WAIT};
use crate::error::TerminalError;
use crate::sampler::Sampler;
use crate::status::StatusSink;
use crate::types::{ConnectionState, Credentials, Sample};

pub use http::HttpConnector;
pub use ws::WsConnector;

/// Dials the collector and completes authentication.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Emits `Authenticating` through `status` if the transport has an explicit
    /// handshake. Returns a ready-to-use link.
    async fn open(
        &self,
        credentials: &Credentials,
        status: &dyn StatusSink,
    ) -> Result<Box<dyn Link>, TerminalError>;
}

/// An authenticated path to the collector.
#[async_trait]
pub trait Link: Send {
    async fn transmit(&mut self, sample: &Sample) -> Result<(), TerminalError>;

    /// Best-effort goodbye. The link is dropped right after regardless.
    async fn close(&mut self) {}
}

/// Pick the transport named in the config.
pub fn build_connector(cfg: &Config) -> anyhow::Result<Box<dyn Connector>> {
    Ok(match cfg.transport {
        TransportKind::Stream => Box::new(WsConnector::from_config(cfg)?),
        TransportKind::Http => Box::new(HttpConnector::from_config(cfg)?),
    })
}

pub struct Session<'a> {
    connector: &'a dyn Connector,
    sampler: &'a mut dyn Sampler,
    status: &'a dyn StatusSink,
    interval: Duration,
}

impl<'a> Session<'a> {
    pub fn new(
        connector: &'a dyn Connector,
        sampler: &'a mut dyn Sampler,
        status: &'a dyn StatusSink,
        interval: Duration,
    ) -> Self {
        Self {
            connector,
            sampler,
            status,
            interval: interval.max(MIN_WAIT),
        }
    }

    /// Run until the link fails or `shutdown` fires. `Ok(())` means cancelled;
    /// every other ending is an `Err`. The link is closed and dropped before
    /// returning in both cases.
    pub async fn run(
        self,
        credentials: &Credentials,
        shutdown: &CancellationToken,
    ) -> Result<(), TerminalError> {
        let mut link = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(()),
            res = self.connector.open(credentials, self.status) => res?,
        };
        self.status.on_connection_state(ConnectionState::Connected);
        info!(endpoint = %credentials.endpoint, "reporting every {:?}", self.interval);

        let Session {
            sampler,
            status,
            interval,
            ..
        } = self;
        let res = send_loop(link.as_mut(), sampler, status, interval, shutdown).await;
        link.close().await;
        res
    }
}

async fn send_loop(
    link: &mut dyn Link,
    sampler: &mut dyn Sampler,
    status: &dyn StatusSink,
    interval: Duration,
    shutdown: &CancellationToken,
) -> Result<(), TerminalError> {
    // First tick completes immediately, so the first sample goes out on connect.
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        let sample = sampler.sample().await;
        status.on_metrics(&sample);
        link.transmit(&sample).await?;
        info!("{}", sample.summary());
    }
}
