//! Streaming transport: one WebSocket per session.
//!
//! Handshake: client sends `{"secret": ...}`, collector answers a flat JSON
//! object whose `status` must be `"ok"`. After that the client only pushes
//! JSON samples.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, Connector as TlsConnector, MaybeTlsStream,
    WebSocketStream,
};
use tracing::{debug, info};
use url::Url;

use super::{Connector, Link};
use crate::config::{Config, DEFAULT_CONNECT_TIMEOUT, MIN_WAIT};
use crate::error::TerminalError;
use crate::status::StatusSink;
use crate::tls;
use crate::types::{AuthMessage, AuthResult, ConnectionState, Credentials, Sample};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Upper bound on waiting for the close handshake when tearing down.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

pub struct WsConnector {
    handshake_timeout: Duration,
    connect_timeout: Duration,
    tls: Option<Arc<rustls::ClientConfig>>,
}

impl WsConnector {
    pub fn new(handshake_timeout: Duration) -> Self {
        Self {
            handshake_timeout,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            tls: None,
        }
    }

    /// Bound on dial plus upgrade, and on every later write.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout.max(MIN_WAIT);
        self
    }

    /// Trust only the CAs in this config for `wss://` endpoints.
    pub fn with_tls(mut self, tls: Arc<rustls::ClientConfig>) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let mut c = Self::new(cfg.handshake_timeout).with_connect_timeout(cfg.connect_timeout);
        if let Some(path) = cfg.tls_ca.as_deref() {
            c = c.with_tls(tls::client_config_with_ca(path)?);
        }
        Ok(c)
    }

    async fn handshake(&self, ws: &mut WsStream, secret: &str) -> Result<AuthResult, TerminalError> {
        let hello = serde_json::to_string(&AuthMessage { secret }).map_err(TerminalError::auth_protocol)?;
        ws.send(Message::Text(hello))
            .await
            .map_err(TerminalError::auth_protocol)?;

        let reply = tokio::time::timeout(self.handshake_timeout, read_reply(ws))
            .await
            .map_err(|_| {
                TerminalError::auth_protocol(format!(
                    "no handshake reply within {:?}",
                    self.handshake_timeout
                ))
            })??;
        AuthResult::from_reply(&reply).map_err(TerminalError::auth_protocol)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(
        &self,
        credentials: &Credentials,
        status: &dyn StatusSink,
    ) -> Result<Box<dyn Link>, TerminalError> {
        let url = Url::parse(&credentials.endpoint).map_err(TerminalError::dial)?;
        info!(%url, "connecting");

        let connector = self.tls.clone().map(TlsConnector::Rustls);
        let dial = connect_async_tls_with_config(url.as_str(), None, false, connector);
        let (mut ws, _) = tokio::time::timeout(self.connect_timeout, dial)
            .await
            .map_err(|_| {
                TerminalError::dial(format!(
                    "no websocket upgrade within {:?}",
                    self.connect_timeout
                ))
            })?
            .map_err(TerminalError::dial)?;

        status.on_connection_state(ConnectionState::Authenticating);
        let auth = self.handshake(&mut ws, &credentials.secret).await?;
        if !auth.accepted {
            return Err(TerminalError::AuthRejected { status: auth.reason });
        }
        info!("authenticated");
        Ok(Box::new(WsLink {
            ws,
            send_timeout: self.connect_timeout,
        }))
    }
}

// Skip control frames; the first data frame is the reply.
async fn read_reply(ws: &mut WsStream) -> Result<String, TerminalError> {
    while let Some(msg) = ws.next().await {
        match msg.map_err(TerminalError::auth_protocol)? {
            Message::Text(text) => return Ok(text),
            Message::Binary(bytes) => {
                return String::from_utf8(bytes).map_err(TerminalError::auth_protocol)
            }
            Message::Close(frame) => {
                return Err(TerminalError::auth_protocol(format!(
                    "collector closed the connection during handshake ({frame:?})"
                )))
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                debug!("control frame during handshake");
            }
        }
    }
    Err(TerminalError::auth_protocol(
        "connection ended before handshake reply",
    ))
}

struct WsLink {
    ws: WsStream,
    send_timeout: Duration,
}

#[async_trait]
impl Link for WsLink {
    async fn transmit(&mut self, sample: &Sample) -> Result<(), TerminalError> {
        let json = serde_json::to_string(sample).map_err(TerminalError::send)?;
        tokio::time::timeout(self.send_timeout, self.ws.send(Message::Text(json)))
            .await
            .map_err(|_| TerminalError::send(format!("send stalled for {:?}", self.send_timeout)))?
            .map_err(TerminalError::send)
    }

    async fn close(&mut self) {
        let _ = tokio::time::timeout(CLOSE_GRACE, self.ws.close(None)).await;
    }
}
