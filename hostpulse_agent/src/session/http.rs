//! Request/response transport: every sample is its own authenticated POST.
//! There is nothing to dial, so `open` only validates the endpoint; a session
//! ends on the first failed or non-200 POST.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use super::{Connector, Link};
use crate::config::Config;
use crate::error::TerminalError;
use crate::status::StatusSink;
use crate::tls;
use crate::types::{Credentials, Sample};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpConnector {
    client: reqwest::Client,
    report_path: String,
}

impl HttpConnector {
    pub fn new(client: reqwest::Client, report_path: impl Into<String>) -> Self {
        Self {
            client,
            report_path: report_path.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);
        if let Some(path) = cfg.tls_ca.as_deref() {
            for cert in tls::reqwest_certificates(path)? {
                builder = builder.add_root_certificate(cert);
            }
        }
        Ok(Self::new(builder.build()?, cfg.report_path.clone()))
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn open(
        &self,
        credentials: &Credentials,
        _status: &dyn StatusSink,
    ) -> Result<Box<dyn Link>, TerminalError> {
        let url = report_url(&credentials.endpoint, &self.report_path)?;
        debug!(%url, "reporting over http");
        Ok(Box::new(HttpLink {
            client: self.client.clone(),
            url,
            secret: credentials.secret.clone(),
        }))
    }
}

/// `<base>/<suffix>` with exactly one slash between them.
pub fn report_url(base: &str, suffix: &str) -> Result<Url, TerminalError> {
    let base = Url::parse(base).map_err(TerminalError::dial)?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(TerminalError::dial(format!(
            "unsupported scheme for http transport: {}",
            base.scheme()
        )));
    }
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        suffix.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(TerminalError::dial)
}

struct HttpLink {
    client: reqwest::Client,
    url: Url,
    secret: String,
}

#[async_trait]
impl Link for HttpLink {
    async fn transmit(&mut self, sample: &Sample) -> Result<(), TerminalError> {
        let resp = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.secret)
            .json(sample)
            .send()
            .await
            .map_err(TerminalError::send)?;

        match resp.status() {
            StatusCode::OK => Ok(()),
            other => Err(TerminalError::SendStatus {
                status: other.as_u16(),
            }),
        }
    }
}
