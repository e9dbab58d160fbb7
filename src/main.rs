//! scrivener - Push-to-talk dictation with local or cloud transcription
//!
//! Entry point for the scrivener CLI application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scrivener::cli::{Cli, Commands};
use scrivener::config::Settings;

fn init_logging(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Completions { shell } => {
            scrivener::cli::completions::print(shell);
        }
        command => {
            // Load configuration only for runtime commands.
            let settings = Settings::load()?;

            let level = if cli.verbose {
                "debug"
            } else {
                settings.general.log_level.as_str()
            };
            init_logging(level);

            // Execute command
            match command {
                Commands::Record {
                    model,
                    cloud,
                    keep_worker,
                } => {
                    scrivener::cli::commands::record(&settings, model, cloud, keep_worker).await?;
                }
                Commands::Transcribe { file, model } => {
                    scrivener::cli::commands::transcribe_file(&settings, &file, model).await?;
                }
                Commands::Worker(worker_cmd) => {
                    scrivener::cli::commands::worker_command(&settings, worker_cmd).await?;
                }
                Commands::History(history_cmd) => {
                    scrivener::cli::commands::history_command(&settings, history_cmd)?;
                }
                Commands::Config(config_cmd) => {
                    scrivener::cli::commands::config_command(&settings, config_cmd)?;
                }
                Commands::Completions { .. } => unreachable!(),
            }
        }
    }

    Ok(())
}
