//! Statistics of a checkpoint store
//!
//! This module provides functionality for summarizing how far a crawl has
//! progressed, as shown by `--status`.

use crate::state::Cursor;
use crate::storage::{CheckpointStore, StorageResult};

/// Checkpoint statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointStatistics {
    /// Current cursor, if the store has been seeded
    pub cursor: Option<Cursor>,

    /// Number of saved records
    pub records: u64,

    /// Number of pages marked complete
    pub pages: u64,

    /// Number of items skipped after a permanent failure
    pub failures: u64,
}

impl CheckpointStatistics {
    pub fn is_complete(&self) -> bool {
        matches!(self.cursor, Some(Cursor::Done))
    }
}

/// Loads statistics from a checkpoint store
///
/// # Arguments
///
/// * `store` - The checkpoint store to query
///
/// # Returns
///
/// * `Ok(CheckpointStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query the store
pub fn load_statistics(store: &dyn CheckpointStore) -> StorageResult<CheckpointStatistics> {
    Ok(CheckpointStatistics {
        cursor: store.read_cursor()?,
        records: store.count_records()?,
        pages: store.completed_pages()?,
        failures: store.count_failures()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CheckpointStatistics) {
    println!("=== Checkpoint Status ===\n");

    let state = match &stats.cursor {
        None => "not seeded (run with --seed)".to_string(),
        Some(Cursor::Done) => "complete".to_string(),
        Some(Cursor::Next(url)) => format!("next page {}", url),
    };
    println!("Cursor: {}", state);
    println!();

    println!("Progress:");
    println!("  Pages completed: {}", stats.pages);
    println!("  Records saved: {}", stats.records);
    if stats.failures > 0 {
        println!("  Items skipped after failures: {}", stats.failures);
    }
}
