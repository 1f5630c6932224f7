//! Directory-backed checkpoint store
//!
//! Layout under the root directory:
//!
//! ```text
//! cursor                  next listing URL or "done", then its page index
//! records/<key>.json      one record per item
//! pages/<NNNN>.page       completed page markers
//! failures/<key>.json     items skipped after a permanent failure
//! ```
//!
//! Every file is written to a temporary file in the same directory and then
//! renamed into place, so a crash never leaves a partially written file.

use crate::state::{Checkpoint, Cursor, ItemKey, Record};
use crate::storage::traits::{CheckpointStore, FailedItem, StorageError, StorageResult};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const CURSOR_FILE: &str = "cursor";
const RECORDS_DIR: &str = "records";
const PAGES_DIR: &str = "pages";
const FAILURES_DIR: &str = "failures";

/// File backend
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) a checkpoint directory
    ///
    /// # Arguments
    ///
    /// * `root` - The checkpoint directory
    ///
    /// # Returns
    ///
    /// * `Ok(FileStore)` - The directory layout exists
    /// * `Err(StorageError)` - A directory could not be created
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in [RECORDS_DIR, PAGES_DIR, FAILURES_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &ItemKey) -> PathBuf {
        self.root
            .join(RECORDS_DIR)
            .join(format!("{}.json", key.file_stem()))
    }

    fn failure_path(&self, key: &ItemKey) -> PathBuf {
        self.root
            .join(FAILURES_DIR)
            .join(format!("{}.json", key.file_stem()))
    }

    fn page_path(&self, index: u64) -> PathBuf {
        self.root.join(PAGES_DIR).join(format!("{:04}.page", index))
    }

    fn cursor_path(&self) -> PathBuf {
        self.root.join(CURSOR_FILE)
    }
}

/// Writes `contents` to a temp file next to `target`
fn stage(target: &Path, contents: &[u8]) -> StorageResult<NamedTempFile> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

/// Atomically replaces `target` with `contents`
fn write_atomic(target: &Path, contents: &[u8]) -> StorageResult<()> {
    stage(target, contents)?
        .persist(target)
        .map_err(|e| StorageError::Persist {
            path: target.display().to_string(),
            source: e.error,
        })?;
    Ok(())
}

/// Atomically creates `target`; an existing file is kept
fn create_atomic(target: &Path, contents: &[u8]) -> StorageResult<()> {
    match stage(target, contents)?.persist_noclobber(target) {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(StorageError::Persist {
            path: target.display().to_string(),
            source: e.error,
        }),
    }
}

/// Counts the files in `dir` with the given extension
fn count_with_extension(dir: &Path, extension: &str) -> StorageResult<u64> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            count += 1;
        }
    }
    Ok(count)
}

fn remove_if_exists(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Parses the cursor file: the token on the first line, optionally
/// followed by the page index on the second
fn parse_checkpoint(contents: &str) -> StorageResult<Option<Checkpoint>> {
    let mut lines = contents.lines().map(str::trim).filter(|l| !l.is_empty());

    let Some(cursor) = lines.next().and_then(Cursor::parse) else {
        return Ok(None);
    };

    let page_index = match lines.next() {
        Some(index) => Some(index.parse::<u64>().map_err(|_| {
            StorageError::Corrupt(format!("invalid page index in cursor file: {:?}", index))
        })?),
        None => None,
    };

    Ok(Some(Checkpoint { cursor, page_index }))
}

impl CheckpointStore for FileStore {
    fn has_record(&self, key: &ItemKey) -> StorageResult<bool> {
        Ok(self.record_path(key).is_file())
    }

    fn write_record(&self, key: &ItemKey, record: &Record) -> StorageResult<()> {
        let path = self.record_path(key);
        if path.is_file() {
            tracing::debug!("Record {} already saved", key);
            return Ok(());
        }

        let json = serde_json::to_vec_pretty(record)?;
        create_atomic(&path, &json)?;
        remove_if_exists(&self.failure_path(key))
    }

    fn read_record(&self, key: &ItemKey) -> StorageResult<Option<Record>> {
        match fs::read(self.record_path(key)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn count_records(&self) -> StorageResult<u64> {
        count_with_extension(&self.root.join(RECORDS_DIR), "json")
    }

    fn read_checkpoint(&self) -> StorageResult<Option<Checkpoint>> {
        match fs::read_to_string(self.cursor_path()) {
            Ok(contents) => parse_checkpoint(&contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_checkpoint(&self, checkpoint: &Checkpoint) -> StorageResult<()> {
        let contents = match checkpoint.page_index {
            Some(index) => format!("{}\n{}\n", checkpoint.cursor.as_token(), index),
            None => checkpoint.cursor.as_token().to_string(),
        };
        write_atomic(&self.cursor_path(), contents.as_bytes())
    }

    fn mark_page_complete(&self, index: u64) -> StorageResult<()> {
        create_atomic(&self.page_path(index), b"")
    }

    fn is_page_complete(&self, index: u64) -> StorageResult<bool> {
        Ok(self.page_path(index).is_file())
    }

    fn completed_pages(&self) -> StorageResult<u64> {
        count_with_extension(&self.root.join(PAGES_DIR), "page")
    }

    fn record_failure(&self, failure: &FailedItem) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(failure)?;
        write_atomic(&self.failure_path(&failure.key), &json)
    }

    fn count_failures(&self) -> StorageResult<u64> {
        count_with_extension(&self.root.join(FAILURES_DIR), "json")
    }
}
