//! Trawler: a polite, topic-aware web crawler
//!
//! This crate walks hyperlink graphs from a seed URL while respecting per-domain
//! rate limits, caching responses, retrying through throttling, and pruning the
//! frontier to links related to the seed's topic.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod output;
pub mod rate_limit;
pub mod relevance;
pub mod retry;
pub mod robots;
pub mod state;
pub mod stealth;
pub mod url;

use serde::Serialize;
use thiserror::Error;

/// Main error type for Trawler operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error for {url}: {message}")]
    Network {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Rate limited by {domain} after {attempts} attempts")]
    RateLimited { domain: String, attempts: u32 },

    #[error("Parse error for {url}: {message}")]
    Parsing { url: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("URL disallowed by robots.txt: {url}")]
    Disallowed { url: String },

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl TrawlError {
    /// Classifies this error into the taxonomy recorded on crawl results
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrawlError::Network { .. } => ErrorKind::Network,
            TrawlError::RateLimited { .. } => ErrorKind::RateLimit,
            TrawlError::Parsing { .. } => ErrorKind::Parsing,
            TrawlError::Validation(_) | TrawlError::Url(_) => ErrorKind::Validation,
            TrawlError::Disallowed { .. } => ErrorKind::Disallowed,
            _ => ErrorKind::Internal,
        }
    }
}

/// Category of a per-page failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection failure, timeout, or a non-2xx status other than 429
    Network,
    /// HTTP 429 persisted past the retry ceiling
    RateLimit,
    /// The fetch succeeded but the body could not be used
    Parsing,
    /// The URL itself is malformed
    Validation,
    /// robots.txt forbids the URL
    Disallowed,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Parsing => "parsing",
            ErrorKind::Validation => "validation",
            ErrorKind::Disallowed => "disallowed",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
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

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Trawler operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use cache::{CacheKey, ResponseCache};
pub use config::Config;
pub use crawler::{
    CrawlEngine, CrawlMode, CrawlReport, CrawlResult, CrawlStats, ExecutionMode, FetchExecutor,
    FetchResponse, Fetcher, HttpFetcher,
};
pub use rate_limit::RateLimiter;
pub use relevance::RelevanceAnalyzer;
pub use retry::RetryPolicy;
pub use state::{DomainRateState, EngineState, PageState};
pub use url::{extract_domain, normalize_url};
