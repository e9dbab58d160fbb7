//! Seam between the recording coordinator and history persistence

use anyhow::Result;

use crate::storage::{Database, TranscriptionRecord};

/// Where finished transcriptions go
pub trait HistoryStore {
    /// Store a record, replacing any record with the same id
    fn save(&self, record: &TranscriptionRecord) -> Result<()>;

    /// Remove a record by id
    fn delete(&self, id: &str) -> Result<()>;
}

impl HistoryStore for Database {
    fn save(&self, record: &TranscriptionRecord) -> Result<()> {
        self.insert_record(record)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.delete_record(id)
    }
}
