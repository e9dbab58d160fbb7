//! SQLite database management for transcription history

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::config::Settings;
use crate::storage::models::TranscriptionRecord;

/// Database wrapper for scrivener
pub struct Database {
    conn: Connection,
}

const CURRENT_SCHEMA_VERSION: i64 = 1;

const RECORD_COLUMNS: &str = "id, text, language, duration_secs, created_at";

impl Database {
    /// Open or create the database
    pub fn open(settings: &Settings) -> Result<Self> {
        let db_path = settings.database_path();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Self::open_path(&db_path)
    }

    /// Open database at a specific path (useful for testing)
    pub fn open_path(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize database schema
    fn initialize(&self) -> Result<()> {
        let current_version = self.schema_version()?;
        if current_version > CURRENT_SCHEMA_VERSION {
            anyhow::bail!(
                "Database schema version {} is newer than supported version {}",
                current_version,
                CURRENT_SCHEMA_VERSION
            );
        }

        if current_version < 1 {
            self.migrate_to_v1()?;
            self.set_schema_version(1)?;
        }

        Ok(())
    }

    /// Current schema version tracked in PRAGMA user_version.
    pub fn schema_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))?)
    }

    fn set_schema_version(&self, version: i64) -> Result<()> {
        self.conn
            .execute(&format!("PRAGMA user_version = {}", version), [])?;
        Ok(())
    }

    fn migrate_to_v1(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS transcriptions (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                language TEXT NOT NULL,
                duration_secs REAL NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transcriptions_created_at
                ON transcriptions(created_at DESC);
            "#,
        )?;

        Ok(())
    }

    /// Insert a record, replacing an existing one with the same id
    pub fn insert_record(&self, record: &TranscriptionRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO transcriptions (id, text, language, duration_secs, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.id,
                record.text,
                record.language,
                record.duration_secs,
                record.created_at.timestamp_millis(),
            ],
        )?;

        Ok(())
    }

    /// Get a record by ID
    pub fn get_record(&self, id: &str) -> Result<Option<TranscriptionRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {} FROM transcriptions WHERE id = ?1", RECORD_COLUMNS),
                params![id],
                Self::row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    /// Find a record by ID prefix
    pub fn find_record_by_prefix(&self, prefix: &str) -> Result<Option<TranscriptionRecord>> {
        let pattern = format!("{}%", prefix);

        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM transcriptions WHERE id LIKE ?1 ORDER BY created_at DESC LIMIT 1",
                    RECORD_COLUMNS
                ),
                params![pattern],
                Self::row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    /// List records, newest first
    pub fn list_records(&self, limit: usize) -> Result<Vec<TranscriptionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM transcriptions ORDER BY created_at DESC LIMIT ?1",
            RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map(params![limit as i64], Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    /// Delete a record
    pub fn delete_record(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM transcriptions WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Delete every record, returning how many were removed
    pub fn delete_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM transcriptions", [])?)
    }

    /// Number of stored records
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM transcriptions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<TranscriptionRecord> {
        let created_millis: i64 = row.get(4)?;

        Ok(TranscriptionRecord {
            id: row.get(0)?,
            text: row.get(1)?,
            language: row.get(2)?,
            duration_secs: row.get(3)?,
            created_at: Utc
                .timestamp_millis_opt(created_millis)
                .single()
                .unwrap_or_default(),
        })
    }

    /// Get history statistics
    pub fn get_stats(&self) -> Result<HistoryStats> {
        let (total_records, total_duration, total_words): (i64, Option<f64>, Option<i64>) =
            self.conn.query_row(
                r#"
                SELECT
                    COUNT(*),
                    SUM(duration_secs),
                    SUM(LENGTH(TRIM(text)) - LENGTH(REPLACE(TRIM(text), ' ', '')) + (LENGTH(TRIM(text)) > 0))
                FROM transcriptions
                "#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        Ok(HistoryStats {
            total_records: total_records as usize,
            total_duration_secs: total_duration.unwrap_or(0.0),
            total_words: total_words.unwrap_or(0) as usize,
        })
    }
}

/// History statistics
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStats {
    pub total_records: usize,
    pub total_duration_secs: f64,
    pub total_words: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use tempfile::tempdir;

    fn record(text: &str, duration_secs: f64) -> TranscriptionRecord {
        TranscriptionRecord::new(text.to_string(), "en".to_string(), duration_secs)
    }

    #[test]
    fn test_create_database() {
        let db = Database::open_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.total_words, 0);
    }

    #[test]
    fn test_insert_and_get_record() {
        let db = Database::open_memory().unwrap();

        let record = record("Buy milk on the way home", 3.5);
        db.insert_record(&record).unwrap();

        let retrieved = db.get_record(&record.id).unwrap().unwrap();
        assert_eq!(retrieved.text, "Buy milk on the way home");
        assert_eq!(retrieved.duration_secs, 3.5);
        assert_eq!(
            retrieved.created_at.timestamp_millis(),
            record.created_at.timestamp_millis()
        );
    }

    #[test]
    fn test_insert_replaces_on_id() {
        let db = Database::open_memory().unwrap();

        let mut record = record("first draft", 2.0);
        db.insert_record(&record).unwrap();

        record.text = "second draft".to_string();
        db.insert_record(&record).unwrap();

        assert_eq!(db.count().unwrap(), 1);
        assert_eq!(db.get_record(&record.id).unwrap().unwrap().text, "second draft");
    }

    #[test]
    fn test_stats_sum_duration_and_words() {
        let db = Database::open_memory().unwrap();
        db.insert_record(&record("one two three", 1.5)).unwrap();
        db.insert_record(&record("four", 2.5)).unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.total_duration_secs, 4.0);
        assert_eq!(stats.total_words, 4);
    }

    #[test]
    fn test_new_database_sets_schema_version() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), 1);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("future.db");

        let conn = Connection::open(&db_path).unwrap();
        conn.execute("PRAGMA user_version = 7", []).unwrap();
        drop(conn);

        assert!(Database::open_path(&db_path).is_err());
    }
}
