//! Config file loading
//!
//! A crawl is driven by one TOML file. The file is parsed, validated, and
//! hashed; the hash is stored on every crawl run row.

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Reads and validates the crawler's TOML config
///
/// Fails with `ConfigError::Io` if the file cannot be read,
/// `ConfigError::Parse` on malformed TOML or missing sections, and
/// `ConfigError::Validation`/`InvalidUrl` when a value is out of range,
/// e.g. `max-concurrent-pages = 0` or a `base-url` carrying a query string.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use review_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Review endpoint: {}", config.endpoint.base_url);
/// ```
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

pub(crate) fn parse_config(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex-encoded SHA-256 of the raw config file
///
/// Recorded on each run so two runs can be checked for having used the same
/// endpoint, timeout, and concurrency settings.
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path)?;
    Ok(hex::encode(Sha256::digest(content.as_bytes())))
}

/// Config plus the hash the crawl driver stores on the run row
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
