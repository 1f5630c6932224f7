use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable that overrides `session.cookie`
pub const COOKIE_ENV: &str = "PAGE_LEDGER_COOKIE";

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use page_ledger::config::load_config;
///
/// let config = load_config(Path::new("ledger.toml")).unwrap();
/// println!("Page size: {}", config.crawler.page_size);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses configuration from TOML text, applies environment overrides and
/// validates the result
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(content)?;

    apply_env_overrides(&mut config);

    validate(&config)?;

    Ok(config)
}

/// Replaces the session cookie with `PAGE_LEDGER_COOKIE` when it is set
fn apply_env_overrides(config: &mut Config) {
    if let Ok(cookie) = std::env::var(COOKIE_ENV) {
        if !cookie.trim().is_empty() {
            tracing::debug!("Using session cookie from {}", COOKIE_ENV);
            config.session.cookie = cookie.trim().to_string();
        }
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs against a changed configuration are easy to spot.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
