//! scrivener - Push-to-talk dictation with pluggable transcription backends
//!
//! Recordings are routed either to a long-lived local worker process reached
//! over a Unix socket, or to a cloud transcriber supplied by the host.

pub mod audio;
pub mod cli;
pub mod config;
pub mod recording;
pub mod storage;
pub mod transcription;
pub mod worker;

use thiserror::Error;

use crate::worker::client::IpcError;

/// Error taxonomy shared by every transcription backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrivenerError {
    /// The worker could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// The backend was reachable but did not answer in time
    #[error("Transcription timed out")]
    Timeout,

    /// Malformed or unexpected response shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Worker not running and could not be started, or no client configured
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The worker or remote API reported an application-level error
    #[error("Transcription failed: {0}")]
    Backend(String),

    /// File I/O, process spawn and other local failures
    #[error("System error: {0}")]
    System(String),
}

impl From<IpcError> for ScrivenerError {
    fn from(err: IpcError) -> Self {
        match err {
            IpcError::ConnectionFailed(reason) => Self::Connection(reason),
            IpcError::Timeout => Self::Timeout,
            IpcError::NoResponse => Self::Connection("no response from worker".to_string()),
            IpcError::InvalidResponse(reason) => Self::Protocol(reason),
        }
    }
}

impl From<std::io::Error> for ScrivenerError {
    fn from(err: std::io::Error) -> Self {
        Self::System(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScrivenerError>;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "scrivener";
