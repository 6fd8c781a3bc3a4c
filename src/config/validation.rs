use crate::config::types::{
    BlocklistConfig, CacheConfig, Config, CrawlerConfig, DomainDelay, RateLimitConfig,
    RelevanceConfig, RetryConfig,
};
use crate::ConfigError;
use regex::Regex;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_relevance_config(&config.relevance)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_retry_config(&config.retry)?;
    validate_cache_config(&config.cache)?;
    validate_blocklist(&config.blocklist)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    for pattern in &config.excluded_patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("excluded pattern '{}': {}", pattern, e))
        })?;
    }

    Ok(())
}

/// Validates relevance configuration
fn validate_relevance_config(config: &RelevanceConfig) -> Result<(), ConfigError> {
    validate_unit_interval("similarity_threshold", config.similarity_threshold)?;
    validate_unit_interval("min_relevance_score", config.min_relevance_score)?;
    validate_unit_interval("high_relevance_threshold", config.high_relevance_threshold)?;

    if config.max_links_per_page < 1 {
        return Err(ConfigError::Validation(
            "relevance max_links_per_page must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates rate limit configuration
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min_delay_ms ({}) must not exceed max_delay_ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    if config.backoff_factor < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_factor must be >= 1.0, got {}",
            config.backoff_factor
        )));
    }

    if config.recovery_factor <= 0.0 || config.recovery_factor > 1.0 {
        return Err(ConfigError::Validation(format!(
            "recovery_factor must be in (0, 1], got {}",
            config.recovery_factor
        )));
    }

    if config.success_threshold < 1 || config.error_threshold < 1 {
        return Err(ConfigError::Validation(
            "success_threshold and error_threshold must be >= 1".to_string(),
        ));
    }

    validate_domain_delays(&config.domains)
}

/// Validates per-domain delay overrides
fn validate_domain_delays(domains: &[DomainDelay]) -> Result<(), ConfigError> {
    for entry in domains {
        let domain = entry.domain.strip_prefix("*.").unwrap_or(&entry.domain);
        validate_domain_string(domain)?;
    }
    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.base_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry base_delay_ms ({}) must not exceed max_delay_ms ({})",
            config.base_delay_ms, config.max_delay_ms
        )));
    }

    if config.multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "retry multiplier must be >= 1.0, got {}",
            config.multiplier
        )));
    }

    validate_unit_interval("jitter", config.jitter)?;

    if config.retry_after_buffer < 1.0 {
        return Err(ConfigError::Validation(format!(
            "retry_after_buffer must be >= 1.0, got {}",
            config.retry_after_buffer
        )));
    }

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    if config.ttl_secs < 1 {
        return Err(ConfigError::Validation("cache ttl_secs must be >= 1".to_string()));
    }

    if config.max_size_mb < 1 {
        return Err(ConfigError::Validation(
            "cache max_size_mb must be >= 1".to_string(),
        ));
    }

    if matches!(&config.path, Some(path) if path.is_empty()) {
        return Err(ConfigError::Validation(
            "cache path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates blocklist domains and extensions
fn validate_blocklist(config: &BlocklistConfig) -> Result<(), ConfigError> {
    for domain in config.domains() {
        validate_domain_string(domain)?;
    }

    for ext in &config.skip_extensions {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(ConfigError::InvalidPattern(format!(
                "Extension '{}' must start with '.'",
                ext
            )));
        }
    }

    Ok(())
}

fn validate_unit_interval(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 0.0 and 1.0, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Validates a domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
