//! Audio capture module for scrivener
//!
//! Recording produces a temporary WAV file per take. The coordinator only
//! sees the [`AudioCapture`] trait; the microphone backend uses cpal.

mod microphone;

pub use microphone::{normalized_level, MicrophoneCapture};

use anyhow::Result;
use std::path::PathBuf;

/// Capture interface consumed by the recording coordinator
pub trait AudioCapture {
    /// Begin a new take
    fn start(&mut self) -> Result<()>;

    /// End the take and return the finalized audio file. The caller owns
    /// the file from here on and is responsible for deleting it.
    fn stop(&mut self) -> Result<PathBuf>;

    /// Whether the current (or just finished) take contained speech
    fn had_voice_activity(&self) -> bool;

    /// Check if currently recording
    fn is_recording(&self) -> bool;
}
