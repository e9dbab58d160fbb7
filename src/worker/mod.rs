//! Worker module for scrivener
//!
//! Owns the lifecycle of the local transcription worker: a separate process
//! that keeps a speech model loaded and answers requests on a Unix socket.
//! The socket file and its `.pid` companion are the only state that survives
//! across runs of this program.

pub mod client;
pub mod ipc;
pub mod process;
pub mod resolver;

use serde_json::{Map, Value};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::worker::client::{IpcError, IpcTransport, SocketClient};
use crate::worker::ipc::{DownloadOutcome, ModelInfo, WorkerRequest, WorkerResponse};
use crate::worker::process::{parse_pid, SystemLauncher, WorkerCommand, WorkerLauncher, WorkerProcess};
use crate::worker::resolver::{ScriptResolver, WorkerResolver};
use crate::ScrivenerError;

/// Static configuration of the worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Socket the worker listens on
    pub socket_path: PathBuf,

    /// Default language passed on the command line
    pub language: String,

    /// Model loaded at startup
    pub model: String,

    /// How long `start` waits for the socket to appear
    pub startup_timeout: Duration,

    /// Interval between socket checks while starting
    pub poll_interval: Duration,

    /// Receive timeout for control commands such as shutdown
    pub control_timeout: Duration,
}

impl WorkerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            socket_path: settings.worker_socket_path(),
            language: settings.general.language.clone(),
            model: settings.worker.model.clone(),
            startup_timeout: Duration::from_millis(settings.worker.startup_timeout_ms),
            poll_interval: Duration::from_millis(settings.worker.startup_poll_interval_ms.max(1)),
            control_timeout: Duration::from_secs(settings.worker.control_timeout_secs),
        }
    }

    /// Lifecycle marker written by the worker: `<socket>.pid`
    pub fn pid_path(&self) -> PathBuf {
        pid_path_for(&self.socket_path)
    }

    fn startup_attempts(&self) -> u128 {
        (self.startup_timeout.as_millis() / self.poll_interval.as_millis().max(1)).max(1)
    }
}

/// `<socket>.pid` next to the given socket path
pub fn pid_path_for(socket_path: &Path) -> PathBuf {
    let mut path = OsString::from(socket_path.as_os_str());
    path.push(".pid");
    PathBuf::from(path)
}

/// Manages the worker process
pub struct WorkerManager {
    config: WorkerConfig,
    resolver: Box<dyn WorkerResolver>,
    launcher: Box<dyn WorkerLauncher>,
    transport: Arc<dyn IpcTransport>,
    process: Mutex<Option<Box<dyn WorkerProcess>>>,
}

impl WorkerManager {
    pub fn new(
        config: WorkerConfig,
        resolver: Box<dyn WorkerResolver>,
        launcher: Box<dyn WorkerLauncher>,
        transport: Arc<dyn IpcTransport>,
    ) -> Self {
        Self {
            config,
            resolver,
            launcher,
            transport,
            process: Mutex::new(None),
        }
    }

    /// Manager wired to real processes and the real socket
    pub fn from_settings(settings: &Settings) -> Self {
        let config = WorkerConfig::from_settings(settings);
        let transport = Arc::new(SocketClient::new(config.socket_path.clone()));
        Self::new(
            config,
            Box::new(ScriptResolver::from_settings(settings)),
            Box::new(SystemLauncher),
            transport,
        )
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Whether the socket file exists. A file check, not a liveness probe;
    /// see [`WorkerManager::ping`] for that.
    pub fn is_running(&self) -> bool {
        self.config.socket_path.exists()
    }

    /// Start the worker with the configured model.
    ///
    /// Never fails outward: a missing interpreter or script, a spawn error,
    /// or a worker that is slow to come up are all logged and the caller
    /// finds out through [`WorkerManager::is_running`].
    pub async fn start(&self) {
        self.start_with_model(&self.config.model).await;
    }

    /// Start the worker loading `model`, unless its socket is already
    /// present. A worker that is already up keeps whatever model it loaded.
    pub async fn start_with_model(&self, model: &str) {
        if self.is_running() {
            info!("Worker already running at {}", self.config.socket_path.display());
            return;
        }

        {
            let mut tracked = self.process.lock().await;
            if let Some(process) = tracked.as_mut() {
                if process.is_alive() {
                    info!("Worker still loading, waiting for its socket again");
                    drop(tracked);
                    self.wait_until_ready().await;
                    return;
                }
            }

            let Some(location) = self.resolver.resolve() else {
                error!("Cannot start worker: interpreter or script not found");
                return;
            };

            if let Some(parent) = self.config.socket_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    warn!("Failed to create {}: {}", parent.display(), e);
                }
            }

            let command = WorkerCommand::new(
                &location.interpreter,
                &location.script,
                &self.config.socket_path,
                &self.config.language,
                model,
            );

            match self.launcher.spawn(&command) {
                Ok(process) => {
                    info!(
                        "Worker started with PID {} (model: {})",
                        process
                            .id()
                            .map(|pid| pid.to_string())
                            .unwrap_or_else(|| "?".to_string()),
                        model
                    );
                    *tracked = Some(process);
                }
                Err(e) => {
                    error!("Failed to start worker: {}", e);
                    return;
                }
            }
        }

        self.wait_until_ready().await;
    }

    /// Poll for the socket. Returns whether it showed up in time; a worker
    /// that misses the deadline may still come up later.
    async fn wait_until_ready(&self) -> bool {
        for _ in 0..self.config.startup_attempts() {
            if self.is_running() {
                info!("Worker socket ready");
                return true;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }

        if self.is_running() {
            info!("Worker socket ready");
            return true;
        }

        warn!(
            "Worker socket not found after {:?}",
            self.config.startup_timeout
        );
        false
    }

    /// Stop the worker. Safe to call when nothing is running.
    ///
    /// Every layer runs regardless of how the previous one went: IPC
    /// shutdown, termination of the tracked child, SIGTERM to the pid in the
    /// marker file, then removal of both lifecycle files.
    pub async fn stop(&self) {
        self.send_shutdown().await;
        self.terminate_tracked().await;
        self.kill_by_pid_file();
        self.remove_lifecycle_files();
        info!("Worker stopped");
    }

    async fn send_shutdown(&self) {
        if !self.is_running() {
            return;
        }

        match self
            .transport
            .send(&WorkerRequest::Shutdown, self.config.control_timeout)
            .await
        {
            Ok(_) => debug!("Worker acknowledged shutdown"),
            Err(e) => warn!("Graceful shutdown failed: {}", e),
        }
    }

    async fn terminate_tracked(&self) {
        let mut tracked = self.process.lock().await;
        if let Some(mut process) = tracked.take() {
            if process.is_alive() {
                if let Err(e) = process.terminate().await {
                    warn!("Failed to terminate worker process: {}", e);
                }
            }
        }
    }

    fn kill_by_pid_file(&self) {
        let pid_path = self.config.pid_path();
        let Ok(contents) = std::fs::read_to_string(&pid_path) else {
            return;
        };

        let Some(pid) = parse_pid(&contents) else {
            warn!("Ignoring malformed pid file {}", pid_path.display());
            return;
        };

        match self.launcher.signal_pid(pid) {
            Ok(()) => debug!("Sent SIGTERM to worker pid {}", pid),
            Err(e) => debug!("Could not signal worker pid {}: {}", pid, e),
        }
    }

    fn remove_lifecycle_files(&self) {
        for path in [self.config.socket_path.clone(), self.config.pid_path()] {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }

    /// Send a raw request through the manager's transport
    pub(crate) async fn request(
        &self,
        request: &WorkerRequest,
        timeout: Duration,
    ) -> Result<Map<String, Value>, IpcError> {
        self.transport.send(request, timeout).await
    }

    /// Liveness probe over IPC
    pub async fn ping(&self) -> bool {
        if !self.is_running() {
            return false;
        }

        match self
            .request(&WorkerRequest::Ping, self.config.control_timeout)
            .await
        {
            Ok(object) => matches!(
                WorkerResponse::from_object(&object),
                Ok(WorkerResponse::Status(_))
            ),
            Err(e) => {
                debug!("Worker ping failed: {}", e);
                false
            }
        }
    }

    /// Models known to the running worker
    pub async fn list_models(&self) -> crate::Result<Vec<ModelInfo>> {
        if !self.is_running() {
            return Err(ScrivenerError::BackendUnavailable(
                "local worker is not running".to_string(),
            ));
        }

        let object = self
            .request(&WorkerRequest::ListModels, self.config.control_timeout)
            .await?;

        match WorkerResponse::from_object(&object) {
            Ok(WorkerResponse::Models(models)) => Ok(models),
            Ok(WorkerResponse::Error { message }) => Err(ScrivenerError::Backend(message)),
            Ok(other) => Err(ScrivenerError::Protocol(format!(
                "unexpected reply to list_models: {:?}",
                other
            ))),
            Err(reason) => Err(ScrivenerError::Protocol(reason)),
        }
    }

    /// Ask the running worker to fetch `model`. `timeout` bounds the whole
    /// download, which can take minutes for the larger models.
    pub async fn download_model(&self, model: &str, timeout: Duration) -> crate::Result<DownloadOutcome> {
        if !self.is_running() {
            return Err(ScrivenerError::BackendUnavailable(
                "local worker is not running".to_string(),
            ));
        }

        info!("Downloading model {}", model);
        let request = WorkerRequest::DownloadModel {
            model: model.to_string(),
        };
        let object = self.request(&request, timeout).await?;

        match WorkerResponse::from_object(&object) {
            Ok(WorkerResponse::Status(status)) => match status.as_str() {
                "ok" => Ok(DownloadOutcome::Downloaded),
                "already_installed" => Ok(DownloadOutcome::AlreadyInstalled),
                _ => Err(ScrivenerError::Backend(format!(
                    "worker could not download model {}",
                    model
                ))),
            },
            Ok(WorkerResponse::Error { message }) => Err(ScrivenerError::Backend(message)),
            Ok(other) => Err(ScrivenerError::Protocol(format!(
                "unexpected reply to download_model: {:?}",
                other
            ))),
            Err(reason) => Err(ScrivenerError::Protocol(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_path_appends_suffix() {
        assert_eq!(
            pid_path_for(Path::new("/tmp/scrivener/worker.sock")),
            PathBuf::from("/tmp/scrivener/worker.sock.pid")
        );
    }

    #[test]
    fn startup_attempts_cover_the_timeout() {
        let config = WorkerConfig {
            socket_path: PathBuf::from("/tmp/worker.sock"),
            language: "en".to_string(),
            model: "small".to_string(),
            startup_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
            control_timeout: Duration::from_secs(5),
        };
        assert_eq!(config.startup_attempts(), 50);

        let config = WorkerConfig {
            startup_timeout: Duration::ZERO,
            ..config
        };
        assert_eq!(config.startup_attempts(), 1);
    }
}
