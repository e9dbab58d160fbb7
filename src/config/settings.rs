//! Application settings management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::transcription::{RemoteCredentials, RemoteProvider};

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// General settings
    #[serde(default)]
    pub general: GeneralSettings,

    /// Local transcription worker
    #[serde(default)]
    pub worker: WorkerSettings,

    /// Microphone capture
    #[serde(default)]
    pub audio: AudioSettings,

    /// Cloud transcription providers
    #[serde(default)]
    pub remote: RemoteSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Data directory for the history database and worker socket
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Transcription language code
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Interpreter used to run the worker script (empty = auto-detect)
    #[serde(default)]
    pub interpreter: PathBuf,

    /// Worker script (empty = auto-detect)
    #[serde(default)]
    pub script: PathBuf,

    /// Model loaded by the worker (tiny, base, small, medium, large-v2, large-v3)
    #[serde(default = "default_model")]
    pub model: String,

    /// Socket path (empty = <data_dir>/worker.sock)
    #[serde(default)]
    pub socket_path: PathBuf,

    /// How long to wait for the worker socket after launch
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,

    /// Interval between socket checks during startup
    #[serde(default = "default_startup_poll_interval_ms")]
    pub startup_poll_interval_ms: u64,

    /// Receive timeout for control commands (shutdown, ping)
    #[serde(default = "default_control_timeout_secs")]
    pub control_timeout_secs: u64,

    /// Receive timeout for a transcription round-trip
    #[serde(default = "default_transcription_timeout_secs")]
    pub transcription_timeout_secs: u64,

    /// Receive timeout for `worker download`
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Start the worker as soon as `record` starts
    #[serde(default = "default_true")]
    pub keep_running: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Sample rate for recording (default: 16000 for Whisper compatibility)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Normalized level (0.0 - 1.0) a take must exceed to count as speech
    #[serde(default = "default_voice_activity_threshold")]
    pub voice_activity_threshold: f32,

    /// Preferred input device (empty = default)
    #[serde(default)]
    pub device: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// OpenAI API key
    #[serde(default)]
    pub openai_api_key: String,

    /// OpenAI transcription model
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Gemini API key
    #[serde(default)]
    pub gemini_api_key: String,

    /// Gemini model
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
}

// Default value functions

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "scrivener", "scrivener")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.local/share/scrivener"))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_model() -> String {
    "small".to_string()
}

fn default_startup_timeout_ms() -> u64 {
    5000
}

fn default_startup_poll_interval_ms() -> u64 {
    100
}

fn default_control_timeout_secs() -> u64 {
    5
}

fn default_transcription_timeout_secs() -> u64 {
    30
}

fn default_download_timeout_secs() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u16 {
    1
}

fn default_voice_activity_threshold() -> f32 {
    0.33
}

fn default_openai_model() -> String {
    "gpt-4o-transcribe".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            language: default_language(),
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::new(),
            script: PathBuf::new(),
            model: default_model(),
            socket_path: PathBuf::new(),
            startup_timeout_ms: default_startup_timeout_ms(),
            startup_poll_interval_ms: default_startup_poll_interval_ms(),
            control_timeout_secs: default_control_timeout_secs(),
            transcription_timeout_secs: default_transcription_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            keep_running: true,
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            voice_activity_threshold: default_voice_activity_threshold(),
            device: String::new(),
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_model: default_openai_model(),
            gemini_api_key: String::new(),
            gemini_model: default_gemini_model(),
        }
    }
}

impl Settings {
    /// Load settings from the configuration file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::debug!("No config file found, using defaults");
            let mut settings = Self::default();
            settings.apply_env_overrides();
            return Ok(settings);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut settings = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        settings.apply_env_overrides();

        Ok(settings)
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        override_if_blank(&mut self.remote.openai_api_key, "SCRIVENER_OPENAI_API_KEY");
        override_if_blank(&mut self.remote.gemini_api_key, "SCRIVENER_GEMINI_API_KEY");
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "scrivener", "scrivener")
            .context("Could not determine config directory")?;

        let config_dir = dirs.config_dir();
        Ok(config_dir.join("config.toml"))
    }

    /// Write default configuration to a file
    pub fn write_default(path: &PathBuf) -> Result<()> {
        let settings = Self::default();
        let content = toml::to_string_pretty(&settings)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the history database path
    pub fn database_path(&self) -> PathBuf {
        self.general.data_dir.join("history.db")
    }

    /// Get the Unix socket path of the worker
    pub fn worker_socket_path(&self) -> PathBuf {
        if self.worker.socket_path.as_os_str().is_empty() {
            self.general.data_dir.join("worker.sock")
        } else {
            self.worker.socket_path.clone()
        }
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.general.data_dir)?;
        if let Some(parent) = self.worker_socket_path().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Credentials for a cloud provider
    pub fn remote_credentials(&self, provider: RemoteProvider) -> RemoteCredentials {
        match provider {
            RemoteProvider::OpenAi => RemoteCredentials::new(
                self.remote.openai_api_key.trim(),
                self.remote.openai_model.trim(),
            ),
            RemoteProvider::Gemini => RemoteCredentials::new(
                self.remote.gemini_api_key.trim(),
                self.remote.gemini_model.trim(),
            ),
        }
    }
}

fn override_if_blank(value: &mut String, var: &str) {
    if !value.trim().is_empty() {
        return;
    }
    if let Ok(from_env) = std::env::var(var) {
        if !from_env.trim().is_empty() {
            *value = from_env;
        }
    }
}
