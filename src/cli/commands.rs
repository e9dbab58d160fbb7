//! CLI command implementations

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::audio::MicrophoneCapture;
use crate::cli::args::{ConfigCommand, HistoryCommand, WorkerCommand};
use crate::config::Settings;
use crate::recording::{Coordinator, RecordingEvent, RecordingState};
use crate::storage::{Database, HistoryStore, TranscriptionRecord};
use crate::transcription::{Dispatcher, RemoteProvider, Transcriber, TranscriptionMode};
use crate::worker::ipc::DownloadOutcome;
use crate::worker::WorkerManager;
use crate::ScrivenerError;

/// Interactive dictation loop
pub async fn record(
    settings: &Settings,
    model: Option<String>,
    cloud: Option<RemoteProvider>,
    keep_worker: bool,
) -> Result<()> {
    let mode = match cloud {
        Some(provider) => TranscriptionMode::remote(provider),
        None => TranscriptionMode::local(model.unwrap_or_else(|| settings.worker.model.clone())),
    };

    if let TranscriptionMode::Remote { provider } = &mode {
        if !settings.remote_credentials(*provider).has_api_key() {
            anyhow::bail!(
                "No {} API key configured. Set it in the config file or SCRIVENER_{}_API_KEY.",
                provider,
                provider.as_str().to_uppercase()
            );
        }
        return Err(ScrivenerError::BackendUnavailable(format!(
            "no {} client is available in this build",
            provider
        ))
        .into());
    }

    settings.ensure_dirs()?;
    let dispatcher = Arc::new(Dispatcher::from_settings(settings));
    let db = Database::open(settings)?;
    let (events_tx, mut events) = mpsc::unbounded_channel();

    let (coordinator, mut completions) = Coordinator::new(
        Box::new(MicrophoneCapture::new(settings)),
        dispatcher.clone(),
        Box::new(db),
        Box::new(events_tx),
        settings.general.language.clone(),
    );
    let mut coordinator = coordinator.with_keep_worker_running(settings.worker.keep_running);

    if mode.is_local() {
        coordinator.start_worker_if_enabled().await;
    }

    println!("Transcribing with {}", mode);
    println!("Enter: start/stop recording   c: cancel   q: quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => coordinator.toggle(&mode),
                    "c" => match coordinator.state() {
                        RecordingState::Recording => {
                            coordinator.cancel();
                            println!("Recording cancelled");
                        }
                        RecordingState::Transcribing => coordinator.cancel_transcription(),
                        RecordingState::Idle => {}
                    },
                    "q" => break,
                    other => println!("Unknown input '{}'", other),
                }
            }
            Some(completion) = completions.recv() => coordinator.complete(completion),
            Some(event) = events.recv() => print_event(&event),
        }
    }

    match coordinator.state() {
        RecordingState::Recording => coordinator.cancel(),
        RecordingState::Transcribing => coordinator.cancel_transcription(),
        RecordingState::Idle => {}
    }

    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }

    if mode.is_local() && !keep_worker {
        dispatcher.stop_worker().await;
    }

    Ok(())
}

fn print_event(event: &RecordingEvent) {
    match event {
        RecordingEvent::RecordingStarted => println!("Recording... (Enter to stop)"),
        RecordingEvent::RecordingStopped => println!("Recording stopped"),
        RecordingEvent::StoppedWithoutVoice => println!("No speech detected, nothing to transcribe"),
        RecordingEvent::TranscriptionStarted => println!("Transcribing..."),
        RecordingEvent::TranscriptionCompleted {
            text,
            duration,
            record_id,
        } => {
            println!();
            println!("{}", text);
            println!();
            println!(
                "({}, saved as {})",
                format_duration(duration.as_secs_f64()),
                short_id(record_id)
            );
        }
        RecordingEvent::TranscriptionFailed { error, .. } => eprintln!("Error: {}", error),
        RecordingEvent::TranscriptionCancelled => println!("Transcription cancelled"),
        RecordingEvent::RecordingFailed { error } => eprintln!("Recording failed: {}", error),
    }
}

/// Transcribe an existing file with the local worker. The input file is
/// never deleted.
pub async fn transcribe_file(settings: &Settings, file: &Path, model: Option<String>) -> Result<()> {
    if !file.is_file() {
        anyhow::bail!("File not found: {}", file.display());
    }

    settings.ensure_dirs()?;
    let dispatcher = Dispatcher::from_settings(settings);
    let mode = TranscriptionMode::local(model.unwrap_or_else(|| settings.worker.model.clone()));

    let text = dispatcher.transcribe(file, &mode).await?;

    let record = TranscriptionRecord::new(
        text.clone(),
        settings.general.language.clone(),
        wav_duration_secs(file).unwrap_or(0.0),
    );
    let db = Database::open(settings)?;
    if let Err(e) = db.save(&record) {
        tracing::warn!("Failed to save transcription to history: {}", e);
    }

    println!("{}", text);

    if !settings.worker.keep_running {
        dispatcher.stop_worker().await;
    }

    Ok(())
}

fn wav_duration_secs(path: &Path) -> Option<f64> {
    let reader = hound::WavReader::open(path).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    Some(reader.duration() as f64 / spec.sample_rate as f64)
}

/// Handle worker subcommands
pub async fn worker_command(settings: &Settings, cmd: WorkerCommand) -> Result<()> {
    let manager = WorkerManager::from_settings(settings);

    match cmd {
        WorkerCommand::Start => {
            manager.start().await;
            if !manager.is_running() {
                anyhow::bail!("Worker failed to start; see the log for details");
            }
            println!("Worker running at {}", manager.socket_path().display());
        }
        WorkerCommand::Stop => {
            manager.stop().await;
            println!("Worker stopped");
        }
        WorkerCommand::Restart => {
            manager.stop().await;
            tokio::time::sleep(Duration::from_millis(500)).await;
            manager.start().await;
            if !manager.is_running() {
                anyhow::bail!("Worker failed to start; see the log for details");
            }
            println!("Worker restarted");
        }
        WorkerCommand::Status => {
            if !manager.is_running() {
                println!("Worker is not running");
            } else if manager.ping().await {
                println!("Worker is running at {}", manager.socket_path().display());
            } else {
                println!(
                    "Worker socket exists at {} but the worker is not responding",
                    manager.socket_path().display()
                );
            }
        }
        WorkerCommand::Models => {
            let models = manager.list_models().await?;
            if models.is_empty() {
                println!("No models reported by the worker");
                return Ok(());
            }
            for model in models {
                let marker = if model.installed { "*" } else { " " };
                println!("{} {}", marker, model.name);
            }
        }
        WorkerCommand::Download { model } => {
            if !manager.is_running() {
                manager.start().await;
                if !manager.is_running() {
                    anyhow::bail!("Worker failed to start; see the log for details");
                }
            }

            println!("Downloading {}...", model);
            let timeout = Duration::from_secs(settings.worker.download_timeout_secs);
            match manager.download_model(&model, timeout).await? {
                DownloadOutcome::Downloaded => println!("Model {} downloaded", model),
                DownloadOutcome::AlreadyInstalled => println!("Model {} is already installed", model),
            }
        }
    }

    Ok(())
}

/// Handle history subcommands
pub fn history_command(settings: &Settings, cmd: HistoryCommand) -> Result<()> {
    let db = Database::open(settings)?;

    match cmd {
        HistoryCommand::List { limit } => {
            let records = db.list_records(limit)?;

            if records.is_empty() {
                println!("No transcriptions found");
                return Ok(());
            }

            println!("{:<10} {:<18} {:<8} {}", "ID", "Date", "Length", "Text");
            println!("{}", "-".repeat(80));

            for record in records {
                println!(
                    "{:<10} {:<18} {:<8} {}",
                    short_id(&record.id),
                    record
                        .created_at
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M"),
                    record.formatted_duration(),
                    record.short_text()
                );
            }
        }
        HistoryCommand::Show { id } => {
            let record = db
                .find_record_by_prefix(&id)?
                .context("Transcription not found")?;

            println!("ID: {}", record.id);
            println!(
                "Date: {}",
                record
                    .created_at
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
            );
            println!("Language: {}", record.language);
            println!("Length: {}", record.formatted_duration());
            println!();
            println!("{}", record.text);
        }
        HistoryCommand::Delete { id } => {
            let record = db
                .find_record_by_prefix(&id)?
                .context("Transcription not found")?;

            db.delete(&record.id)?;
            println!("Deleted {}", short_id(&record.id));
        }
        HistoryCommand::Clear => {
            let removed = db.delete_all()?;
            println!("Deleted {} transcriptions", removed);
        }
        HistoryCommand::Stats => {
            let stats = db.get_stats()?;
            println!("Transcriptions: {}", stats.total_records);
            println!("Total length: {}", format_duration(stats.total_duration_secs));
            println!("Total words: {}", stats.total_words);
        }
    }

    Ok(())
}

/// Handle config subcommands
pub fn config_command(settings: &Settings, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let toml = toml::to_string_pretty(settings)?;
            println!("{}", toml);
        }
        ConfigCommand::Path => {
            let path = Settings::config_path()?;
            println!("{}", path.display());
        }
        ConfigCommand::Init { force } => {
            let path = Settings::config_path()?;

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }

            Settings::write_default(&path)?;
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

// Helper functions

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn format_duration(secs: f64) -> String {
    let secs = secs.max(0.0) as u64;
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
