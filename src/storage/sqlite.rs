//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CheckpointStore
//! trait. Each write is a single statement, so SQLite's journal gives the same
//! all-or-nothing guarantee as the file backend's rename.

use crate::state::{Checkpoint, Cursor, ItemKey, Record};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CheckpointStore, FailedItem, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a checkpoint database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn count(&self, table: &str) -> StorageResult<u64> {
        let count: i64 = self
            .conn()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }
}

impl CheckpointStore for SqliteStore {
    // ===== Records =====

    fn has_record(&self, key: &ItemKey) -> StorageResult<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM records WHERE item_key = ?1",
                params![key.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn write_record(&self, key: &ItemKey, record: &Record) -> StorageResult<()> {
        let fields = serde_json::to_string(record)?;
        let now = Utc::now().to_rfc3339();

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO records (item_key, fields, saved_at) VALUES (?1, ?2, ?3)",
            params![key.as_str(), fields, now],
        )?;
        tx.execute(
            "DELETE FROM failures WHERE item_key = ?1",
            params![key.as_str()],
        )?;
        tx.commit()?;

        if inserted == 0 {
            tracing::debug!("Record {} already saved", key);
        }
        Ok(())
    }

    fn read_record(&self, key: &ItemKey) -> StorageResult<Option<Record>> {
        let fields: Option<String> = self
            .conn()
            .query_row(
                "SELECT fields FROM records WHERE item_key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match fields {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn count_records(&self) -> StorageResult<u64> {
        self.count("records")
    }

    // ===== Cursor =====

    fn read_checkpoint(&self) -> StorageResult<Option<Checkpoint>> {
        let row: Option<(String, Option<i64>)> = self
            .conn()
            .query_row(
                "SELECT token, page_index FROM cursor WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.and_then(|(token, page_index)| {
            Cursor::parse(&token).map(|cursor| Checkpoint {
                cursor,
                page_index: page_index.map(|i| i as u64),
            })
        }))
    }

    fn write_checkpoint(&self, checkpoint: &Checkpoint) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO cursor (id, token, page_index, updated_at) VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET token = excluded.token,
                page_index = excluded.page_index, updated_at = excluded.updated_at",
            params![
                checkpoint.cursor.as_token(),
                checkpoint.page_index.map(|i| i as i64),
                now
            ],
        )?;
        Ok(())
    }

    // ===== Page markers =====

    fn mark_page_complete(&self, index: u64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT OR IGNORE INTO pages (page_index, completed_at) VALUES (?1, ?2)",
            params![index as i64, now],
        )?;
        Ok(())
    }

    fn is_page_complete(&self, index: u64) -> StorageResult<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM pages WHERE page_index = ?1",
                params![index as i64],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn completed_pages(&self) -> StorageResult<u64> {
        self.count("pages")
    }

    // ===== Failures =====

    fn record_failure(&self, failure: &FailedItem) -> StorageResult<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO failures (item_key, reason, failed_at) VALUES (?1, ?2, ?3)",
            params![
                failure.key.as_str(),
                failure.reason,
                failure.failed_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn count_failures(&self) -> StorageResult<u64> {
        self.count("failures")
    }
}
