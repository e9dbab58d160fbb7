//! IPC client for talking to the transcription worker
//!
//! One request per connection: connect, write one line, read one reply,
//! close. No pooling, so a dead worker just fails the next connect.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::Instant;

use crate::worker::ipc::{deserialize_object, serialize_request, WorkerRequest};

/// Largest reply accepted from the worker. Anything longer is truncated
/// and will fail to parse.
pub const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// Failures at the socket layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IpcError {
    #[error("Socket connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Socket request timed out")]
    Timeout,

    #[error("No response from socket")]
    NoResponse,

    #[error("Invalid response from socket: {0}")]
    InvalidResponse(String),
}

/// Something that can deliver a request to the worker and return its reply
#[async_trait]
pub trait IpcTransport: Send + Sync {
    /// Send one request; `timeout` bounds the receive only
    async fn send(
        &self,
        request: &WorkerRequest,
        timeout: Duration,
    ) -> Result<Map<String, Value>, IpcError>;
}

/// Unix stream socket client
#[derive(Debug, Clone)]
pub struct SocketClient {
    socket_path: PathBuf,
}

impl SocketClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

#[async_trait]
impl IpcTransport for SocketClient {
    async fn send(
        &self,
        request: &WorkerRequest,
        timeout: Duration,
    ) -> Result<Map<String, Value>, IpcError> {
        let mut stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            IpcError::ConnectionFailed(format!("{}: {}", self.socket_path.display(), e))
        })?;

        tracing::debug!("Sending `{}` to worker", request.command());

        let bytes = serialize_request(request);
        stream
            .write_all(&bytes)
            .await
            .map_err(|e| IpcError::ConnectionFailed(format!("failed to write request: {}", e)))?;
        stream
            .flush()
            .await
            .map_err(|e| IpcError::ConnectionFailed(format!("failed to flush request: {}", e)))?;

        let response = read_response(&mut stream, timeout).await?;

        deserialize_object(&response).map_err(IpcError::InvalidResponse)
    }
}

/// Read until a newline, end of stream, or a full buffer, whichever comes
/// first. The deadline covers the whole receive.
async fn read_response(stream: &mut UnixStream, timeout: Duration) -> Result<Vec<u8>, IpcError> {
    let deadline = Instant::now() + timeout;
    let mut buffer = vec![0u8; MAX_RESPONSE_BYTES];
    let mut filled = 0;

    while filled < buffer.len() {
        let read = match tokio::time::timeout_at(deadline, stream.read(&mut buffer[filled..])).await
        {
            Ok(Ok(read)) => read,
            Ok(Err(e)) if filled == 0 && is_timeout(&e) => return Err(IpcError::Timeout),
            Ok(Err(e)) => {
                return Err(IpcError::ConnectionFailed(format!(
                    "failed to read response: {}",
                    e
                )))
            }
            Err(_) if filled == 0 => return Err(IpcError::Timeout),
            Err(_) => break,
        };

        if read == 0 {
            break;
        }

        let newly_read = &buffer[filled..filled + read];
        filled += read;
        if newly_read.contains(&b'\n') {
            break;
        }
    }

    if filled == 0 {
        return Err(IpcError::NoResponse);
    }

    if filled == buffer.len() {
        tracing::warn!(
            "Worker response filled the {} byte buffer and may be truncated",
            MAX_RESPONSE_BYTES
        );
    }

    buffer.truncate(filled);
    Ok(buffer)
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}
