//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::transcription::RemoteProvider;

/// scrivener - Push-to-talk dictation with local or cloud transcription
#[derive(Parser, Debug)]
#[command(name = "scrivener")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dictate interactively: Enter starts/stops a take, `c` cancels, `q` quits
    Record {
        /// Local model to transcribe with (defaults to worker.model)
        #[arg(short, long, conflicts_with = "cloud")]
        model: Option<String>,

        /// Transcribe with a cloud provider instead (openai, gemini)
        #[arg(long)]
        cloud: Option<RemoteProvider>,

        /// Leave the worker running on exit
        #[arg(long)]
        keep_worker: bool,
    },

    /// Transcribe an existing audio file with the local worker
    Transcribe {
        /// Audio file (WAV)
        file: PathBuf,

        /// Local model to use (defaults to worker.model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Local worker management commands
    #[command(subcommand)]
    Worker(WorkerCommand),

    /// Transcription history
    #[command(subcommand)]
    History(HistoryCommand),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum WorkerCommand {
    /// Start the worker and wait for its socket
    Start,

    /// Stop the worker and remove its socket and pid files
    Stop,

    /// Restart the worker
    Restart,

    /// Check worker status
    Status,

    /// List models known to the running worker
    Models,

    /// Download a model through the worker, starting it if needed
    Download {
        /// Model name (e.g. tiny, base, small, medium, large-v3)
        model: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List recent transcriptions
    List {
        /// Maximum number of transcriptions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show a transcription in full
    Show {
        /// Transcription ID or partial ID
        id: String,
    },

    /// Delete a transcription
    Delete {
        /// Transcription ID or partial ID
        id: String,
    },

    /// Delete all transcriptions
    Clear,

    /// Show totals across all transcriptions
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}
