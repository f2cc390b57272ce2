//! Terminal errors: every way a reporting session can end.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a [`TerminalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DialFailure,
    AuthFailure,
    AuthProtocolError,
    SendFailure,
}

/// Ends the current session. The supervisor logs it and reconnects; it is
/// never fatal to the process.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("dial failed: {0}")]
    Dial(#[source] BoxError),

    #[error("collector rejected credentials (status: {status:?})")]
    AuthRejected { status: String },

    #[error("auth handshake failed: {0}")]
    AuthProtocol(#[source] BoxError),

    #[error("send failed: {0}")]
    Send(#[source] BoxError),

    #[error("collector answered HTTP {status}")]
    SendStatus { status: u16 },
}

impl TerminalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TerminalError::Dial(_) => ErrorKind::DialFailure,
            TerminalError::AuthRejected { .. } => ErrorKind::AuthFailure,
            TerminalError::AuthProtocol(_) => ErrorKind::AuthProtocolError,
            TerminalError::Send(_) | TerminalError::SendStatus { .. } => ErrorKind::SendFailure,
        }
    }

    pub(crate) fn dial(e: impl Into<BoxError>) -> Self {
        TerminalError::Dial(e.into())
    }

    pub(crate) fn auth_protocol(e: impl Into<BoxError>) -> Self {
        TerminalError::AuthProtocol(e.into())
    }

    pub(crate) fn send(e: impl Into<BoxError>) -> Self {
        TerminalError::Send(e.into())
    }
}
