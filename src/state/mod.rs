//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: the phases of the pagination state machine
//! - `Cursor` / `Checkpoint`: the persisted resumption token and page index
//! - `ItemRef` / `ItemKey`: composite item identifiers
//! - `Record` / `FieldValue`: fields extracted from a detail resource

mod crawl_state;
mod cursor;
mod item;

// Re-export main types
pub use crawl_state::CrawlPhase;
pub use cursor::{Checkpoint, Cursor};
pub use item::{FieldValue, ItemKey, ItemRef, Record};
