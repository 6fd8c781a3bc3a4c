use crate::crawler::executor::ExecutorStats;
use crate::relevance::RelevanceReport;
use crate::state::EngineState;
use crate::{ErrorKind, TrawlError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Why a page produced no content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&TrawlError> for PageError {
    fn from(error: &TrawlError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Outcome of visiting one URL; produced exactly once per visited URL
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    /// Normalized URL
    pub url: String,
    pub depth: u32,
    pub title: Option<String>,
    /// Visible text, cut to the configured content limit
    pub text_content: Option<String>,
    /// Normalized, de-duplicated links found on the page
    pub outgoing_links: Vec<String>,
    pub matched_keywords: Vec<String>,
    /// Topic relevance in [0, 1]
    pub relevance_score: f64,
    pub status: Option<u16>,
    pub from_cache: bool,
    pub error: Option<PageError>,
}

impl CrawlResult {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
            title: None,
            text_content: None,
            outgoing_links: Vec::new(),
            matched_keywords: Vec::new(),
            relevance_score: 0.0,
            status: None,
            from_cache: false,
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, depth: u32, error: PageError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(url, depth)
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Running counters for one crawl
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Pages with at least one keyword match
    pub matched: usize,
    pub links_found: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl CrawlStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            total: 0,
            successful: 0,
            failed: 0,
            matched: 0,
            links_found: 0,
            started_at,
            finished_at: None,
        }
    }

    pub fn record(&mut self, result: &CrawlResult) {
        self.total += 1;
        if result.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        if !result.matched_keywords.is_empty() {
            self.matched += 1;
        }
        self.links_found += result.outgoing_links.len();
    }

    pub fn finish(&mut self, at: DateTime<Utc>) {
        self.finished_at = Some(at);
    }

    /// Elapsed time, up to now if the crawl is still running
    pub fn duration(&self) -> Duration {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Successful share of completed pages, 0.0 before any page completes
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful as f64 / self.total as f64
        }
    }

    pub fn pages_per_second(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.total as f64 / secs
        } else {
            0.0
        }
    }
}

/// Everything a finished crawl hands back to its caller
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub seed: String,
    pub state: EngineState,
    pub results: Vec<CrawlResult>,
    pub stats: CrawlStats,
    pub executor: ExecutorStats,
    pub relevance: Option<RelevanceReport>,
}

impl CrawlReport {
    pub fn result_for(&self, url: &str) -> Option<&CrawlResult> {
        self.results.iter().find(|r| r.url == url)
    }

    pub fn sitemap(&self) -> Sitemap {
        Sitemap {
            seed: self.seed.clone(),
            total_pages: self.results.len(),
            max_depth: self.results.iter().map(|r| r.depth).max().unwrap_or(0),
            pages: self
                .results
                .iter()
                .map(|r| SitemapEntry {
                    url: r.url.clone(),
                    depth: r.depth,
                    title: r.title.clone(),
                    matched_keywords: r.matched_keywords.clone(),
                    links_count: r.outgoing_links.len(),
                    error: r.error.as_ref().map(|e| e.message.clone()),
                })
                .collect(),
        }
    }
}

/// Flat outline of the crawled pages
#[derive(Debug, Clone, Serialize)]
pub struct Sitemap {
    pub seed: String,
    pub total_pages: usize,
    pub max_depth: u32,
    pub pages: Vec<SitemapEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SitemapEntry {
    pub url: String,
    pub depth: u32,
    pub title: Option<String>,
    pub matched_keywords: Vec<String>,
    pub links_count: usize,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(url: &str, depth: u32, links: usize, matched: bool) -> CrawlResult {
        CrawlResult {
            outgoing_links: (0..links).map(|i| format!("{}/{}", url, i)).collect(),
            matched_keywords: if matched { vec!["news".into()] } else { vec![] },
            ..CrawlResult::new(url, depth)
        }
    }

    #[test]
    fn test_stats_totals_add_up() {
        let mut stats = CrawlStats::default();
        stats.record(&success("https://example.com", 0, 3, true));
        stats.record(&success("https://example.com/a", 1, 2, false));
        stats.record(&CrawlResult::failed(
            "https://example.com/b",
            1,
            PageError {
                kind: ErrorKind::Network,
                message: "HTTP 500".into(),
            },
        ));

        assert_eq!(stats.total, 3);
        assert_eq!(stats.total, stats.successful + stats.failed);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.links_found, 5);
        assert!((stats.success_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_success_rate_empty() {
        assert_eq!(CrawlStats::default().success_rate(), 0.0);
    }

    #[test]
    fn test_duration_uses_finish_time() {
        let start = Utc::now();
        let mut stats = CrawlStats::new(start);
        stats.finish(start + chrono::Duration::seconds(4));
        assert_eq!(stats.duration(), Duration::from_secs(4));
        assert!((stats.pages_per_second() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_page_error_from_trawl_error() {
        let error = TrawlError::RateLimited {
            domain: "example.com".into(),
            attempts: 4,
        };
        let page_error = PageError::from(&error);
        assert_eq!(page_error.kind, ErrorKind::RateLimit);
        assert!(page_error.message.contains("example.com"));
    }

    #[test]
    fn test_sitemap() {
        let report = CrawlReport {
            seed: "https://example.com".into(),
            state: EngineState::Completed,
            results: vec![
                success("https://example.com", 0, 2, true),
                success("https://example.com/a", 1, 0, false),
            ],
            stats: CrawlStats::default(),
            executor: ExecutorStats::default(),
            relevance: None,
        };

        let sitemap = report.sitemap();
        assert_eq!(sitemap.total_pages, 2);
        assert_eq!(sitemap.max_depth, 1);
        assert_eq!(sitemap.pages[0].links_count, 2);
        assert_eq!(sitemap.pages[0].matched_keywords, vec!["news"]);
        assert!(report.result_for("https://example.com/a").is_some());
    }
}
