//! Recording state and lifecycle notifications

use std::time::Duration;
use tokio::sync::mpsc;

use crate::ScrivenerError;

/// Where the coordinator is in the recording cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordingState {
    /// Waiting for the user
    #[default]
    Idle,

    /// Microphone is capturing
    Recording,

    /// A take is with a transcription backend
    Transcribing,
}

impl RecordingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
            RecordingState::Transcribing => "transcribing",
        }
    }
}

impl std::fmt::Display for RecordingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingEvent {
    RecordingStarted,

    RecordingStopped,

    /// The take contained no speech and was discarded
    StoppedWithoutVoice,

    TranscriptionStarted,

    TranscriptionCompleted {
        text: String,
        /// Length of the take, excluding transcription time
        duration: Duration,
        record_id: String,
    },

    TranscriptionFailed {
        error: ScrivenerError,
        duration: Duration,
    },

    TranscriptionCancelled,

    /// The microphone could not be opened or finalized
    RecordingFailed { error: String },
}

/// Receives lifecycle notifications from the coordinator
pub trait RecordingObserver {
    fn on_event(&mut self, event: RecordingEvent);
}

impl RecordingObserver for mpsc::UnboundedSender<RecordingEvent> {
    fn on_event(&mut self, event: RecordingEvent) {
        // A dropped receiver just means nobody is listening anymore
        let _ = self.send(event);
    }
}

impl<F> RecordingObserver for F
where
    F: FnMut(RecordingEvent),
{
    fn on_event(&mut self, event: RecordingEvent) {
        self(event)
    }
}
