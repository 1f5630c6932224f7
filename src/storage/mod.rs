//! Storage module for checkpointing crawl progress
//!
//! This module persists everything needed to resume a crawl:
//! - One record per item, written once and never mutated
//! - Completed page markers
//! - The cursor naming the next listing page
//! - Items skipped after a permanent failure
//!
//! Two backends implement [`CheckpointStore`]: [`FileStore`] (a directory of
//! JSON files) and [`SqliteStore`] (a single database file).

mod files;
mod schema;
mod sqlite;
mod traits;

pub use files::FileStore;
pub use sqlite::SqliteStore;
pub use traits::{CheckpointStore, FailedItem, StorageError, StorageResult};

use crate::config::{OutputConfig, StorageBackend};
use std::path::Path;
use std::sync::Arc;

/// Opens the checkpoint store selected by the output configuration
///
/// # Arguments
///
/// * `output` - The output configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn CheckpointStore>)` - The opened store
/// * `Err(StorageError)` - The directory or database could not be opened
pub fn open_store(output: &OutputConfig) -> StorageResult<Arc<dyn CheckpointStore>> {
    match output.backend {
        StorageBackend::Files => {
            tracing::debug!("Opening checkpoint directory {}", output.directory);
            Ok(Arc::new(FileStore::open(&output.directory)?))
        }
        StorageBackend::Sqlite => {
            tracing::debug!("Opening checkpoint database {}", output.database_path);
            Ok(Arc::new(SqliteStore::new(Path::new(&output.database_path))?))
        }
    }
}
