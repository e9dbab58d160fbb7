//! Data models for storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length of [`TranscriptionRecord::short_text`] before the ellipsis
const SHORT_TEXT_CHARS: usize = 50;

/// One finished transcription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionRecord {
    /// Unique identifier (UUID)
    pub id: String,

    /// Transcribed text
    pub text: String,

    /// Language the recording was transcribed in
    pub language: String,

    /// Recording length in seconds, excluding transcription time
    pub duration_secs: f64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl TranscriptionRecord {
    pub fn new(text: String, language: String, duration_secs: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text,
            language,
            duration_secs,
            created_at: Utc::now(),
        }
    }

    /// First 50 characters, with "..." when cut
    pub fn short_text(&self) -> String {
        if self.text.chars().count() <= SHORT_TEXT_CHARS {
            return self.text.clone();
        }
        let mut short: String = self.text.chars().take(SHORT_TEXT_CHARS).collect();
        short.push_str("...");
        short
    }

    /// Duration as `m:ss`
    pub fn formatted_duration(&self) -> String {
        let secs = self.duration_secs.max(0.0) as u64;
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}
