#![allow(dead_code)]
//! In-memory stand-ins for the sampler, the status display and the transport.

use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use hostpulse_agent::{
    error::ErrorKind,
    sampler::Sampler,
    session::{Connector, Link},
    status::StatusSink,
    ConnectionState, Credentials, Sample, TerminalError,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

pub fn creds() -> Credentials {
    Credentials {
        endpoint: "ws://collector.invalid/ws".into(),
        secret: "s3cret".into(),
    }
}

/// Produces samples whose `cpu` field is 1, 2, 3, ... so order is checkable.
#[derive(Clone, Default)]
pub struct CountingSampler {
    pub taken: Arc<AtomicU64>,
}

impl CountingSampler {
    pub fn count(&self) -> u64 {
        self.taken.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sampler for CountingSampler {
    async fn sample(&mut self) -> Sample {
        let n = self.taken.fetch_add(1, Ordering::SeqCst) + 1;
        Sample {
            cpu: n as f64,
            ram: 50.0,
            ram_used_mb: 4096,
            ram_total_mb: 8192,
            gpu: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    State(ConnectionState),
    Metrics(Sample),
    Error(ErrorKind),
}

#[derive(Default)]
pub struct RecordingStatus {
    events: Mutex<Vec<Event>>,
}

impl RecordingStatus {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<ConnectionState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ErrorKind> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(k) => Some(k),
                _ => None,
            })
            .collect()
    }
}

impl StatusSink for RecordingStatus {
    fn on_metrics(&self, sample: &Sample) {
        self.events.lock().unwrap().push(Event::Metrics(*sample));
    }

    fn on_connection_state(&self, state: ConnectionState) {
        self.events.lock().unwrap().push(Event::State(state));
    }

    fn on_error(&self, err: &TerminalError) {
        self.events.lock().unwrap().push(Event::Error(err.kind()));
    }
}

/// What the next `open` does.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    FailDial,
    RejectAuth,
    /// Accept; the link fails on the send after `Some(n)` successful ones.
    Accept(Option<usize>),
}

/// Plays `Script`s in order, then fails every further dial. Reports the
/// instant of every `open` and every successful transmission.
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Script>>,
    opens: mpsc::UnboundedSender<Instant>,
    sent: mpsc::UnboundedSender<(Instant, Sample)>,
}

impl ScriptedConnector {
    pub fn new(
        script: Vec<Script>,
    ) -> (
        Self,
        mpsc::UnboundedReceiver<Instant>,
        mpsc::UnboundedReceiver<(Instant, Sample)>,
    ) {
        let (opens, opens_rx) = mpsc::unbounded_channel();
        let (sent, sent_rx) = mpsc::unbounded_channel();
        let c = Self {
            script: Mutex::new(script.into()),
            opens,
            sent,
        };
        (c, opens_rx, sent_rx)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(
        &self,
        _credentials: &Credentials,
        status: &dyn StatusSink,
    ) -> Result<Box<dyn Link>, TerminalError> {
        let _ = self.opens.send(Instant::now());
        let next = self.script.lock().unwrap().pop_front();
        match next.unwrap_or(Script::FailDial) {
            Script::FailDial => Err(TerminalError::Dial("connection refused".into())),
            Script::RejectAuth => {
                status.on_connection_state(ConnectionState::Authenticating);
                Err(TerminalError::AuthRejected {
                    status: "fail".into(),
                })
            }
            Script::Accept(fail_after) => Ok(Box::new(ScriptedLink {
                fail_after,
                sent: 0,
                out: self.sent.clone(),
            })),
        }
    }
}

struct ScriptedLink {
    fail_after: Option<usize>,
    sent: usize,
    out: mpsc::UnboundedSender<(Instant, Sample)>,
}

#[async_trait]
impl Link for ScriptedLink {
    async fn transmit(&mut self, sample: &Sample) -> Result<(), TerminalError> {
        if self.fail_after.is_some_and(|n| self.sent >= n) {
            return Err(TerminalError::Send("broken pipe".into()));
        }
        self.sent += 1;
        let _ = self.out.send((Instant::now(), *sample));
        Ok(())
    }
}
