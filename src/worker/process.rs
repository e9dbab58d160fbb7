//! Launching and signalling the worker process

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

/// How long a terminated worker gets to exit before it is killed outright
const TERMINATE_GRACE: Duration = Duration::from_secs(3);

/// Command line used to launch the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// `<interpreter> <script> --socket-path <socket> --language <lang> --model <model>`
    pub fn new(
        interpreter: &Path,
        script: &Path,
        socket_path: &Path,
        language: &str,
        model: &str,
    ) -> Self {
        Self {
            program: interpreter.to_path_buf(),
            args: vec![
                script.to_string_lossy().into_owned(),
                "--socket-path".to_string(),
                socket_path.to_string_lossy().into_owned(),
                "--language".to_string(),
                language.to_string(),
                "--model".to_string(),
                model.to_string(),
            ],
        }
    }
}

/// Handle to a spawned worker
#[async_trait]
pub trait WorkerProcess: Send {
    /// OS process id, if still known
    fn id(&self) -> Option<u32>;

    /// Whether the process has not exited yet
    fn is_alive(&mut self) -> bool;

    /// Ask the process to exit and wait for it
    async fn terminate(&mut self) -> io::Result<()>;
}

/// Spawns workers and signals them by pid
pub trait WorkerLauncher: Send + Sync {
    fn spawn(&self, command: &WorkerCommand) -> io::Result<Box<dyn WorkerProcess>>;

    /// Send SIGTERM to a pid read from the lifecycle marker
    fn signal_pid(&self, pid: i32) -> io::Result<()>;
}

/// Launcher backed by real OS processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl WorkerLauncher for SystemLauncher {
    fn spawn(&self, command: &WorkerCommand) -> io::Result<Box<dyn WorkerProcess>> {
        let child = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            // Own process group so a terminal Ctrl-C aimed at us does not reach the worker
            .process_group(0)
            .spawn()?;

        Ok(Box::new(ChildProcess { child }))
    }

    fn signal_pid(&self, pid: i32) -> io::Result<()> {
        send_sigterm(pid)
    }
}

struct ChildProcess {
    child: tokio::process::Child,
}

#[async_trait]
impl WorkerProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn terminate(&mut self) -> io::Result<()> {
        if let Some(pid) = self.child.id() {
            let pid = i32::try_from(pid)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
            send_sigterm(pid)?;
        }

        match tokio::time::timeout(TERMINATE_GRACE, self.child.wait()).await {
            Ok(status) => {
                tracing::debug!("Worker exited: {}", status?);
                Ok(())
            }
            Err(_) => {
                tracing::warn!("Worker ignored SIGTERM, killing it");
                self.child.kill().await
            }
        }
    }
}

/// SIGTERM a single process. Non-positive pids are refused: kill(2) treats
/// them as process groups.
pub fn send_sigterm(pid: i32) -> io::Result<()> {
    if pid <= 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to signal pid {}", pid),
        ));
    }

    // SAFETY: kill(2) takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Parse the contents of a pid file
pub fn parse_pid(contents: &str) -> Option<i32> {
    contents.trim().parse::<i32>().ok().filter(|pid| *pid > 0)
}
