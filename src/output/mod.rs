//! Output module for operator-facing reporting
//!
//! This module handles:
//! - Progress lines and remaining-time formatting during a crawl
//! - Checkpoint statistics for `--status`

mod progress;
pub mod stats;

pub use progress::{format_eta, progress_line};
pub use stats::{load_statistics, print_statistics, CheckpointStatistics};
