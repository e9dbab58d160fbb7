//! Recording/transcription state machine

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::audio::AudioCapture;
use crate::recording::state::{RecordingEvent, RecordingObserver, RecordingState};
use crate::storage::{HistoryStore, TranscriptionRecord};
use crate::transcription::{Transcriber, TranscriptionMode};

/// Delay between stopping and starting the worker on restart
const RESTART_DELAY: Duration = Duration::from_millis(500);

/// Result of a background transcription, to be fed back into
/// [`Coordinator::complete`]
#[derive(Debug)]
pub struct TranscriptionCompletion {
    ticket: u64,
    result: crate::Result<String>,
}

/// The take currently with a backend
#[derive(Debug)]
struct PendingTranscription {
    ticket: u64,
    audio: PathBuf,
    duration: Duration,
}

/// Drives one recording at a time from capture to history.
///
/// All entry points take `&mut self`; callers serialize them. Transcription
/// runs on a spawned task whose result comes back through the receiver
/// returned by [`Coordinator::new`]. Every path out of `Recording` or
/// `Transcribing` deletes the temporary audio file before notifying.
pub struct Coordinator {
    state: RecordingState,
    capture: Box<dyn AudioCapture>,
    transcriber: Arc<dyn Transcriber>,
    history: Box<dyn HistoryStore>,
    observer: Box<dyn RecordingObserver>,
    language: String,
    keep_worker_running: bool,
    started_at: Option<Instant>,
    pending: Option<PendingTranscription>,
    next_ticket: u64,
    completions: mpsc::UnboundedSender<TranscriptionCompletion>,
}

impl Coordinator {
    pub fn new(
        capture: Box<dyn AudioCapture>,
        transcriber: Arc<dyn Transcriber>,
        history: Box<dyn HistoryStore>,
        observer: Box<dyn RecordingObserver>,
        language: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<TranscriptionCompletion>) {
        let (completions, receiver) = mpsc::unbounded_channel();

        let coordinator = Self {
            state: RecordingState::Idle,
            capture,
            transcriber,
            history,
            observer,
            language: language.into(),
            keep_worker_running: true,
            started_at: None,
            pending: None,
            next_ticket: 0,
            completions,
        };

        (coordinator, receiver)
    }

    /// Whether [`Coordinator::start_worker_if_enabled`] should start the worker
    pub fn with_keep_worker_running(mut self, keep: bool) -> Self {
        self.keep_worker_running = keep;
        self
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Start recording, or stop and hand the take to a backend.
    ///
    /// Ignored while a transcription is in flight.
    pub fn toggle(&mut self, mode: &TranscriptionMode) {
        match self.state {
            RecordingState::Idle => self.start_recording(),
            RecordingState::Recording => self.stop_recording(mode),
            RecordingState::Transcribing => {
                debug!("Toggle ignored while transcribing");
            }
        }
    }

    /// Drop the current take without transcribing it
    pub fn cancel(&mut self) {
        if self.state != RecordingState::Recording {
            return;
        }

        match self.capture.stop() {
            Ok(audio) => remove_audio(&audio),
            Err(e) => warn!("Failed to stop capture on cancel: {}", e),
        }

        self.started_at = None;
        self.state = RecordingState::Idle;
        info!("Recording cancelled");
    }

    /// Stop waiting for the in-flight transcription. The backend call keeps
    /// running; its result is discarded when it arrives.
    pub fn cancel_transcription(&mut self) {
        if self.state != RecordingState::Transcribing {
            return;
        }

        if let Some(pending) = self.pending.take() {
            remove_audio(&pending.audio);
        }

        self.state = RecordingState::Idle;
        info!("Transcription cancelled");
        self.observer.on_event(RecordingEvent::TranscriptionCancelled);
    }

    /// Apply a finished transcription. Completions that do not belong to the
    /// current cycle are ignored.
    pub fn complete(&mut self, completion: TranscriptionCompletion) {
        let is_current = self
            .pending
            .as_ref()
            .map(|pending| pending.ticket == completion.ticket)
            .unwrap_or(false);

        if !is_current {
            debug!("Discarding stale transcription result #{}", completion.ticket);
            return;
        }

        let Some(pending) = self.pending.take() else {
            return;
        };

        self.state = RecordingState::Idle;

        match completion.result {
            Ok(text) => {
                let record = TranscriptionRecord::new(
                    text.clone(),
                    self.language.clone(),
                    pending.duration.as_secs_f64(),
                );

                if let Err(e) = self.history.save(&record) {
                    error!("Failed to save transcription to history: {}", e);
                }

                remove_audio(&pending.audio);

                info!("Transcription complete ({} chars)", text.len());
                self.observer.on_event(RecordingEvent::TranscriptionCompleted {
                    text,
                    duration: pending.duration,
                    record_id: record.id,
                });
            }
            Err(e) => {
                remove_audio(&pending.audio);

                warn!("Transcription failed: {}", e);
                self.observer.on_event(RecordingEvent::TranscriptionFailed {
                    error: e,
                    duration: pending.duration,
                });
            }
        }
    }

    /// Start or stop the local worker outside of a recording cycle
    pub async fn set_worker_enabled(&self, enabled: bool) {
        if enabled {
            self.transcriber.start_worker().await;
        } else {
            self.transcriber.stop_worker().await;
        }
    }

    /// Start the worker if it is configured to stay warm
    pub async fn start_worker_if_enabled(&self) {
        if self.keep_worker_running {
            self.transcriber.start_worker().await;
        }
    }

    pub async fn restart_worker(&self) {
        self.transcriber.stop_worker().await;
        tokio::time::sleep(RESTART_DELAY).await;
        self.transcriber.start_worker().await;
    }

    fn start_recording(&mut self) {
        if let Err(e) = self.capture.start() {
            error!("Failed to start recording: {}", e);
            self.observer.on_event(RecordingEvent::RecordingFailed {
                error: e.to_string(),
            });
            return;
        }

        self.state = RecordingState::Recording;
        self.started_at = Some(Instant::now());
        info!("Recording started");
        self.observer.on_event(RecordingEvent::RecordingStarted);
    }

    fn stop_recording(&mut self, mode: &TranscriptionMode) {
        let had_voice = self.capture.had_voice_activity();
        let stopped = self.capture.stop();
        let duration = self
            .started_at
            .take()
            .map(|started| started.elapsed())
            .unwrap_or_default();

        let audio = match stopped {
            Ok(audio) => audio,
            Err(e) => {
                error!("Failed to stop recording: {}", e);
                self.state = RecordingState::Idle;
                self.observer.on_event(RecordingEvent::RecordingFailed {
                    error: e.to_string(),
                });
                return;
            }
        };

        self.observer.on_event(RecordingEvent::RecordingStopped);

        if !had_voice {
            remove_audio(&audio);
            self.state = RecordingState::Idle;
            info!("No voice activity detected, skipping transcription");
            self.observer.on_event(RecordingEvent::StoppedWithoutVoice);
            return;
        }

        self.state = RecordingState::Transcribing;
        self.observer.on_event(RecordingEvent::TranscriptionStarted);
        self.spawn_transcription(audio, duration, mode.clone());
    }

    fn spawn_transcription(&mut self, audio: PathBuf, duration: Duration, mode: TranscriptionMode) {
        self.next_ticket += 1;
        let ticket = self.next_ticket;

        self.pending = Some(PendingTranscription {
            ticket,
            audio: audio.clone(),
            duration,
        });

        let transcriber = self.transcriber.clone();
        let completions = self.completions.clone();

        info!("Transcribing {:.1}s take via {}", duration.as_secs_f64(), mode);
        tokio::spawn(async move {
            let result = transcriber.transcribe(&audio, &mode).await;
            let _ = completions.send(TranscriptionCompletion { ticket, result });
        });
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            remove_audio(&pending.audio);
        }
    }
}

fn remove_audio(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
