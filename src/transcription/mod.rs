//! Transcription module for scrivener
//!
//! Routes a recorded audio file to the local worker or a cloud backend and
//! folds every backend's failures into [`crate::ScrivenerError`].

mod dispatcher;
mod mode;
mod remote;

pub use dispatcher::{Dispatcher, Transcriber};
pub use mode::{RemoteProvider, TranscriptionMode};
pub use remote::{RemoteCredentials, RemoteTranscriber};
