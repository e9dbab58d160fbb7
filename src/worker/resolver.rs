//! Locating the worker interpreter and script

use std::path::PathBuf;

use crate::config::Settings;

/// File name of the worker script
pub const WORKER_SCRIPT_NAME: &str = "transcribe_daemon.py";

const INTERPRETER_CANDIDATES: &[&str] = &[
    "/usr/local/bin/python3",
    "/opt/homebrew/bin/python3",
    "/usr/bin/python3",
];

/// Where the worker lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerLocation {
    pub interpreter: PathBuf,
    pub script: PathBuf,
}

/// Finds the worker executable and script.
///
/// Returning `None` is not an error: the local backend is optional.
pub trait WorkerResolver: Send + Sync {
    fn resolve(&self) -> Option<WorkerLocation>;
}

/// Resolver that walks ordered candidate lists and picks the first file
/// that exists.
#[derive(Debug, Clone)]
pub struct ScriptResolver {
    interpreters: Vec<PathBuf>,
    scripts: Vec<PathBuf>,
}

impl ScriptResolver {
    pub fn new(interpreters: Vec<PathBuf>, scripts: Vec<PathBuf>) -> Self {
        Self {
            interpreters,
            scripts,
        }
    }

    /// Configured paths first, then the well-known locations
    pub fn from_settings(settings: &Settings) -> Self {
        let mut interpreters = Vec::new();
        if let Some(interpreter) = non_empty(&settings.worker.interpreter) {
            interpreters.push(interpreter);
        }
        interpreters.extend(INTERPRETER_CANDIDATES.iter().map(PathBuf::from));

        let mut scripts = Vec::new();
        if let Some(script) = non_empty(&settings.worker.script) {
            scripts.push(script);
        }
        scripts.push(settings.general.data_dir.join(WORKER_SCRIPT_NAME));
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()))
        {
            scripts.push(exe_dir.join(WORKER_SCRIPT_NAME));
        }

        Self::new(interpreters, scripts)
    }

    pub fn find_interpreter(&self) -> Option<PathBuf> {
        self.interpreters.iter().find(|path| path.is_file()).cloned()
    }

    pub fn find_script(&self) -> Option<PathBuf> {
        self.scripts.iter().find(|path| path.is_file()).cloned()
    }
}

impl WorkerResolver for ScriptResolver {
    fn resolve(&self) -> Option<WorkerLocation> {
        let interpreter = self.find_interpreter();
        let script = self.find_script();

        match (interpreter, script) {
            (Some(interpreter), Some(script)) => Some(WorkerLocation {
                interpreter,
                script,
            }),
            (None, _) => {
                tracing::debug!("No worker interpreter found among {:?}", self.interpreters);
                None
            }
            (_, None) => {
                tracing::debug!("No worker script found among {:?}", self.scripts);
                None
            }
        }
    }
}

fn non_empty(path: &std::path::Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path.to_path_buf())
    }
}
