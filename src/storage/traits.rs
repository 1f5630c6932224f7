//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::state::{Checkpoint, Cursor, ItemKey, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to move {path} into place: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt checkpoint data: {0}")]
    Corrupt(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// An item that was given up on under the `skip` failure policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub key: ItemKey,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

impl FailedItem {
    pub fn new(key: ItemKey, reason: impl Into<String>) -> Self {
        Self {
            key,
            reason: reason.into(),
            failed_at: Utc::now(),
        }
    }
}

/// Durable store of per-item records, page markers and the cursor
///
/// Implementations must be safe to share between item tasks. Every write is
/// either fully visible or not visible at all after a crash.
pub trait CheckpointStore: Send + Sync {
    // ===== Records =====

    /// Returns true if a record for `key` has been written
    fn has_record(&self, key: &ItemKey) -> StorageResult<bool>;

    /// Writes the record for `key`
    ///
    /// Idempotent: if a record already exists it is left untouched. A record
    /// supersedes an earlier failure of the same item.
    fn write_record(&self, key: &ItemKey, record: &Record) -> StorageResult<()>;

    /// Reads the record for `key`, if any
    fn read_record(&self, key: &ItemKey) -> StorageResult<Option<Record>>;

    /// Number of records written so far
    fn count_records(&self) -> StorageResult<u64>;

    // ===== Cursor =====

    /// Reads the cursor and its page index; None if never written or empty
    fn read_checkpoint(&self) -> StorageResult<Option<Checkpoint>>;

    /// Replaces the cursor and its page index in a single write
    fn write_checkpoint(&self, checkpoint: &Checkpoint) -> StorageResult<()>;

    fn read_cursor(&self) -> StorageResult<Option<Cursor>> {
        Ok(self.read_checkpoint()?.map(|checkpoint| checkpoint.cursor))
    }

    /// Replaces the cursor and forgets the page index
    fn write_cursor(&self, cursor: &Cursor) -> StorageResult<()> {
        self.write_checkpoint(&Checkpoint::without_index(cursor.clone()))
    }

    // ===== Page markers =====

    /// Marks the page with the given index as fully processed
    fn mark_page_complete(&self, index: u64) -> StorageResult<()>;

    fn is_page_complete(&self, index: u64) -> StorageResult<bool>;

    /// Number of pages marked complete
    fn completed_pages(&self) -> StorageResult<u64>;

    // ===== Failures =====

    /// Records an item that was skipped after a permanent failure
    fn record_failure(&self, failure: &FailedItem) -> StorageResult<()>;

    fn count_failures(&self) -> StorageResult<u64>;
}
