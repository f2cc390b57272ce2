//! Library side of hostpulse_agent: sampling, the reporting session, the
//! reconnecting supervisor, and the status display contract.

pub mod config;
pub mod error;
pub mod gpu;
pub mod logging;
pub mod sampler;
pub mod session;
pub mod status;
pub mod supervisor;
pub mod tls;
pub mod types;

pub use config::Config;
pub use error::{ErrorKind, TerminalError};
pub use status::{StatusBoard, StatusSink};
pub use supervisor::Supervisor;
pub use types::{ConnectionState, Credentials, Sample};
