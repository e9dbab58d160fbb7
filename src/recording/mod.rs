//! Recording/transcription cycle
//!
//! The [`Coordinator`] owns the state machine that takes a take from the
//! microphone through a transcription backend into history.

mod coordinator;
mod state;

pub use coordinator::{Coordinator, TranscriptionCompletion};
pub use state::{RecordingEvent, RecordingObserver, RecordingState};
