//! Page-Ledger: a resumable crawler for paginated, authenticated listings
//!
//! This crate walks a paginated result listing, fetches a detail resource for
//! every listed item, and persists the extracted fields as one record per item.
//! Progress is checkpointed after every page so an interrupted crawl resumes
//! without re-fetching work that is already on disk.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Page-Ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Session expired while fetching {url}; refresh the session cookie and rerun")]
    SessionExpired { url: String },

    #[error("No cursor found; seed the crawl with --seed before running")]
    NoCursor,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Item task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Returns true for failures that only concern a single item and may be
    /// recorded and skipped under the `skip` item-failure policy
    pub fn is_item_failure(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Unknown placeholder in URL template: {{{0}}}")]
    UnknownPlaceholder(String),

    #[error("Unterminated placeholder in URL template: {0}")]
    UnterminatedPlaceholder(String),
}

/// Result type alias for Page-Ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use state::{Checkpoint, CrawlPhase, Cursor, FieldValue, ItemKey, ItemRef, Record};
pub use storage::CheckpointStore;
