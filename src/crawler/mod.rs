//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The `Fetcher` seam and its reqwest implementation
//! - The fetch executor: cache, rate limit, stealth headers, and retries
//! - HTML parsing and link extraction
//! - The shared frontier and the crawl engine that drains it

mod engine;
mod executor;
mod fetcher;
mod frontier;
mod parser;
mod response;
mod result;

pub use engine::{CancelHandle, CrawlEngine, CrawlMode, ExecutionMode, ProgressCallback};
pub use executor::{ExecutorStats, FetchExecutor};
pub use fetcher::{build_http_client, Fetcher, HttpFetcher};
pub use frontier::{Claim, CrawlTarget, Frontier, LinkOrigin};
pub use parser::{
    parse_page, resolve_link, ExtractError, Extracted, ExtractionKind, PageLink, ParsedPage,
};
pub use response::{FetchError, FetchRequest, FetchResponse};
pub use result::{CrawlReport, CrawlResult, CrawlStats, PageError, Sitemap, SitemapEntry};
