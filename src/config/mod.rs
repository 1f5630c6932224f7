//! Configuration module for Page-Ledger
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use page_ledger::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ledger.toml")).unwrap();
//! println!("Up to {} requests in flight", config.crawler.max_parallel_requests);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DetailConfig, ItemFailurePolicy, ListingConfig, MarkupConfig,
    OutputConfig, PaginationMode, SessionConfig, StorageBackend,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config, COOKIE_ENV};

pub(crate) use validation::compile_selector;
