//! Configuration module for Trawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! All sections are optional; `Config::default()` is a complete, valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use trawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("trawler.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackoffStrategy, BlocklistConfig, CacheConfig, Config, CrawlerConfig, DomainDelay,
    ExecutionKind, RateLimitConfig, RelevanceConfig, RetryConfig, StealthConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
