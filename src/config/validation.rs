use crate::config::types::{BrowserConfig, CrawlerConfig, DenyEntry, MirrorConfig, OutputConfig};
use crate::ConfigError;

/// Largest accepted batch size
const MAX_BATCH_SIZE: usize = 64;

/// Smallest accepted navigation timeout (milliseconds)
const MIN_NAVIGATION_TIMEOUT_MS: u64 = 100;

/// Validates the entire configuration
///
/// Seed URLs are not parsed here: a malformed seed is dropped with a warning
/// when the crawl starts rather than failing the whole run.
pub fn validate(config: &MirrorConfig) -> Result<(), ConfigError> {
    validate_output_config(&config.output)?;
    validate_crawler_config(&config.crawler)?;
    validate_browser_config(&config.browser)?;
    validate_denylist(&config.denylist)?;
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if let Some(selector) = config.selectors.iter().find(|s| s.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "selectors cannot be blank, got '{}'",
            selector
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    if config.max_failed_batches < 1 {
        return Err(ConfigError::Validation(
            "max_failed_batches must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates browser configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.navigation_timeout_ms < MIN_NAVIGATION_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "navigation_timeout_ms must be >= {}ms, got {}ms",
            MIN_NAVIGATION_TIMEOUT_MS, config.navigation_timeout_ms
        )));
    }

    if config.idle_window_ms == 0 {
        return Err(ConfigError::Validation(
            "idle_window_ms must be > 0".to_string(),
        ));
    }

    if config.idle_window_ms >= config.navigation_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "idle_window_ms ({}ms) must be shorter than navigation_timeout_ms ({}ms)",
            config.idle_window_ms, config.navigation_timeout_ms
        )));
    }

    if config.viewport_width == 0 || config.viewport_height == 0 {
        return Err(ConfigError::Validation(format!(
            "viewport must be non-empty, got {}x{}",
            config.viewport_width, config.viewport_height
        )));
    }

    Ok(())
}

/// Validates denylist entries
fn validate_denylist(entries: &[DenyEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        validate_pattern(&entry.pattern)?;
    }
    Ok(())
}

/// Validates a single denylist pattern
fn validate_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.trim().is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Denylist pattern cannot be empty".to_string(),
        ));
    }

    // A lone wildcard would abort every request, including the page itself
    if pattern.chars().all(|c| c == '*') {
        return Err(ConfigError::InvalidPattern(format!(
            "Denylist pattern '{}' would block every request",
            pattern
        )));
    }

    if pattern.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidPattern(format!(
            "Denylist pattern '{}' contains whitespace",
            pattern
        )));
    }

    Ok(())
}
