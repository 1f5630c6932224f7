use serde::Deserialize;

/// Main configuration structure for Page-Ledger
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub listing: ListingConfig,
    pub detail: DetailConfig,
    #[serde(default)]
    pub markup: MarkupConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once
    #[serde(rename = "max-parallel-requests", default = "default_max_parallel")]
    pub max_parallel_requests: u32,

    /// Number of recent fetch durations kept for the time estimate
    #[serde(rename = "max-samples", default = "default_max_samples")]
    pub max_samples: u32,

    /// Number of items per listing page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout (seconds); a timeout counts as a transient failure
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Retries after the first attempt before a transient failure is fatal
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds), doubled on every retry
    #[serde(rename = "retry-base-delay-ms", default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Upper bound for the retry delay (milliseconds)
    #[serde(rename = "retry-max-delay-ms", default = "default_retry_max_delay")]
    pub retry_max_delay_ms: u64,

    /// What to do when a single item fails permanently
    #[serde(rename = "item-failure-policy", default)]
    pub item_failure_policy: ItemFailurePolicy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_parallel_requests: default_max_parallel(),
            max_samples: default_max_samples(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
            retry_max_delay_ms: default_retry_max_delay(),
            item_failure_policy: ItemFailurePolicy::default(),
        }
    }
}

/// Policy for items whose detail fetch fails permanently
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemFailurePolicy {
    /// Abort the crawl; the cursor stays on the page with the failed item
    #[default]
    Abort,

    /// Record the failure and let the page complete without the item
    Skip,
}

/// Session credential and client identification
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Raw `Cookie` header value sent with every request
    #[serde(default)]
    pub cookie: String,

    /// User agent string
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie: String::new(),
            user_agent: default_user_agent(),
        }
    }
}

/// The paginated listing to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// URL of the first listing page
    pub url: String,

    /// How the next listing page is located
    #[serde(default)]
    pub pagination: PaginationMode,

    /// Query parameter carrying the item offset (offset pagination)
    #[serde(rename = "offset-param", default = "default_offset_param")]
    pub offset_param: String,

    /// Query parameter carrying the page size (offset pagination)
    #[serde(rename = "count-param", default = "default_count_param")]
    pub count_param: String,
}

/// Pagination strategy of the listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationMode {
    /// Rewrite the offset query parameter until the total count is reached
    #[default]
    Offset,

    /// Follow the "next page" anchor found on each listing page
    NextLink,
}

/// The per-item detail resource
#[derive(Debug, Clone, Deserialize)]
pub struct DetailConfig {
    /// URL template with `{record_id}`, `{page_id}` and `{db_id}` placeholders
    #[serde(rename = "url-template")]
    pub url_template: String,
}

/// CSS selectors used to extract data from listing and detail markup
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MarkupConfig {
    /// Element whose text contains "... of <total>"
    pub total_count: String,
    /// One element per listed item
    pub item_row: String,
    pub record_id_attr: String,
    pub page_id_attr: String,
    pub db_id_attr: String,
    /// Anchor to the next listing page (next-link pagination)
    pub next_link: String,
    /// Any match means the session cookie is no longer accepted
    pub session_expired: String,
    /// One element per field on a detail resource
    pub field_row: String,
    /// Elements holding the values of a multi-valued field
    pub multi_value: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            total_count: "#results-header".to_string(),
            item_row: "tr.record".to_string(),
            record_id_attr: "rid".to_string(),
            page_id_attr: "pid".to_string(),
            db_id_attr: "dbid".to_string(),
            next_link: "a.next".to_string(),
            session_expired: "form#signInForm".to_string(),
            field_row: ".hoverDataWrapper > table > tbody > tr".to_string(),
            multi_value: ".unveiled_label".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Checkpoint backend
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory of the file backend
    #[serde(default = "default_directory")]
    pub directory: String,

    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            directory: default_directory(),
            database_path: default_database_path(),
        }
    }
}

/// Checkpoint storage backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Cursor file plus one JSON file per record
    #[default]
    Files,

    /// Single SQLite database
    Sqlite,
}

fn default_max_parallel() -> u32 {
    5
}

fn default_max_samples() -> u32 {
    100
}

fn default_page_size() -> u32 {
    50
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_base_delay() -> u64 {
    500
}

fn default_retry_max_delay() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    format!("page-ledger/{}", env!("CARGO_PKG_VERSION"))
}

fn default_offset_param() -> String {
    "fh".to_string()
}

fn default_count_param() -> String {
    "count".to_string()
}

fn default_directory() -> String {
    "./crawl".to_string()
}

fn default_database_path() -> String {
    "./crawl.db".to_string()
}
