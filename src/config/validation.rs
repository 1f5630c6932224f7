use crate::config::types::{
    Config, CrawlerConfig, DetailConfig, ListingConfig, MarkupConfig, OutputConfig,
    SessionConfig, StorageBackend,
};
use crate::url::DetailUrlTemplate;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_session_config(&config.session)?;
    validate_listing_config(&config.listing)?;
    validate_detail_config(&config.detail)?;
    validate_markup_config(&config.markup)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_parallel_requests < 1 || config.max_parallel_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_parallel_requests must be between 1 and 100, got {}",
            config.max_parallel_requests
        )));
    }

    if config.max_samples < 1 {
        return Err(ConfigError::Validation(format!(
            "max_samples must be >= 1, got {}",
            config.max_samples
        )));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.retry_base_delay_ms > config.retry_max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry_base_delay_ms ({}) must not exceed retry_max_delay_ms ({})",
            config.retry_base_delay_ms, config.retry_max_delay_ms
        )));
    }

    Ok(())
}

/// Validates the session credential
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.cookie.is_empty() {
        tracing::warn!("No session cookie configured; requests will be unauthenticated");
    } else if !config
        .cookie
        .bytes()
        .all(|b| b == b'\t' || (0x20..0x7f).contains(&b))
    {
        return Err(ConfigError::Validation(
            "session cookie must contain only visible ASCII characters".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the listing entry point
fn validate_listing_config(config: &ListingConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid listing url '{}': {}", config.url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Listing url '{}' must use http or https",
            config.url
        )));
    }

    if config.offset_param.is_empty() || config.count_param.is_empty() {
        return Err(ConfigError::Validation(
            "offset_param and count_param cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the detail URL template
fn validate_detail_config(config: &DetailConfig) -> Result<(), ConfigError> {
    DetailUrlTemplate::parse(&config.url_template)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid detail url-template: {}", e)))
}

/// Validates that every selector compiles
fn validate_markup_config(config: &MarkupConfig) -> Result<(), ConfigError> {
    for (name, selector) in [
        ("total-count", &config.total_count),
        ("item-row", &config.item_row),
        ("next-link", &config.next_link),
        ("session-expired", &config.session_expired),
        ("field-row", &config.field_row),
        ("multi-value", &config.multi_value),
    ] {
        compile_selector(name, selector)?;
    }

    for (name, attr) in [
        ("record-id-attr", &config.record_id_attr),
        ("page-id-attr", &config.page_id_attr),
        ("db-id-attr", &config.db_id_attr),
    ] {
        if attr.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    match config.backend {
        StorageBackend::Files if config.directory.is_empty() => Err(ConfigError::Validation(
            "directory cannot be empty".to_string(),
        )),
        StorageBackend::Sqlite if config.database_path.is_empty() => Err(
            ConfigError::Validation("database_path cannot be empty".to_string()),
        ),
        _ => Ok(()),
    }
}

/// Compiles a CSS selector, naming the offending config key on failure
pub(crate) fn compile_selector(name: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| {
        ConfigError::InvalidSelector(format!("{} = '{}': {:?}", name, selector, e))
    })
}
