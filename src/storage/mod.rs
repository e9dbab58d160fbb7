//! Storage module for scrivener
//!
//! Transcription history kept in SQLite.

mod database;
mod history;
mod models;

pub use database::{Database, HistoryStats};
pub use history::HistoryStore;
pub use models::TranscriptionRecord;
