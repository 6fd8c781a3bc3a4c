use serde::Deserialize;

/// Main configuration structure for Trawler
///
/// Every section is optional; missing sections and fields fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub relevance: RelevanceConfig,
    #[serde(rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub stealth: StealthConfig,
    pub blocklist: BlocklistConfig,
}

/// How concurrent fetches are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionKind {
    /// N spawned workers popping from a shared frontier
    #[default]
    WorkerPool,
    /// One task driving a bounded set of outstanding fetches
    Async,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum depth to crawl from the seed URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of pages fetched in one run
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Maximum number of concurrent fetches
    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    pub execution: ExecutionKind,

    /// Follow links that leave the seed's domain
    #[serde(rename = "follow-external")]
    pub follow_external: bool,

    /// With `follow-external`, only these domains and their subdomains are
    /// followed; empty allows any domain
    #[serde(rename = "allowed-domains")]
    pub allowed_domains: Vec<String>,

    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,

    /// Number of characters of visible text kept per result
    #[serde(rename = "content-limit")]
    pub content_limit: usize,

    /// Outgoing links followed per page in keyword mode
    #[serde(rename = "max-links-per-page")]
    pub max_links_per_page: usize,

    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Identity matched against robots.txt groups
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Regular expressions; matching links are never followed
    #[serde(rename = "excluded-patterns")]
    pub excluded_patterns: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 100,
            max_workers: 10,
            execution: ExecutionKind::WorkerPool,
            follow_external: false,
            allowed_domains: Vec::new(),
            respect_robots: true,
            content_limit: 5000,
            max_links_per_page: 50,
            request_timeout_secs: 30,
            user_agent: format!("trawler/{}", env!("CARGO_PKG_VERSION")),
            excluded_patterns: Vec::new(),
        }
    }
}

/// Relevance-aware crawling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    #[serde(rename = "similarity-threshold")]
    pub similarity_threshold: f64,

    /// Links scoring below this are not enqueued
    #[serde(rename = "min-relevance-score")]
    pub min_relevance_score: f64,

    #[serde(rename = "max-links-per-page")]
    pub max_links_per_page: usize,

    /// Links scoring at least this are front-inserted into the frontier
    #[serde(rename = "high-relevance-threshold")]
    pub high_relevance_threshold: f64,

    #[serde(rename = "prioritize-high-relevance")]
    pub prioritize_high_relevance: bool,

    #[serde(rename = "max-path-depth")]
    pub max_path_depth: usize,

    #[serde(rename = "max-query-params")]
    pub max_query_params: usize,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            min_relevance_score: 0.4,
            max_links_per_page: 10,
            high_relevance_threshold: 0.7,
            prioritize_high_relevance: true,
            max_path_depth: 6,
            max_query_params: 3,
        }
    }
}

/// Per-domain request cadence configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum time between requests to the same domain (milliseconds)
    #[serde(rename = "default-delay-ms")]
    pub default_delay_ms: u64,

    /// Tune each domain's delay from success/failure feedback
    pub adaptive: bool,

    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    #[serde(rename = "backoff-factor")]
    pub backoff_factor: f64,

    #[serde(rename = "recovery-factor")]
    pub recovery_factor: f64,

    /// Consecutive successes before the delay is relaxed
    #[serde(rename = "success-threshold")]
    pub success_threshold: u32,

    /// Consecutive non-429 errors before the delay is raised
    #[serde(rename = "error-threshold")]
    pub error_threshold: u32,

    pub domains: Vec<DomainDelay>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: 1000,
            adaptive: false,
            min_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_factor: 2.0,
            recovery_factor: 0.9,
            success_threshold: 5,
            error_threshold: 3,
            domains: Vec::new(),
        }
    }
}

/// Delay override for a single domain
#[derive(Debug, Clone, Deserialize)]
pub struct DomainDelay {
    pub domain: String,

    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,
}

/// Backoff curve selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackoffStrategy {
    #[default]
    Exponential,
    Decorrelated,
}

/// Retry and backoff configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries for transient failures and 5xx responses
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Retries for HTTP 429 before giving up on the page
    #[serde(rename = "rate-limit-retries")]
    pub rate_limit_retries: u32,

    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    pub multiplier: f64,

    pub jitter: f64,

    /// Multiplier applied to a server's Retry-After value
    #[serde(rename = "retry-after-buffer")]
    pub retry_after_buffer: f64,

    pub strategy: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            rate_limit_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 300_000,
            multiplier: 2.0,
            jitter: 0.3,
            retry_after_buffer: 1.1,
            strategy: BackoffStrategy::Exponential,
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    #[serde(rename = "ttl-secs")]
    pub ttl_secs: u64,

    /// Size ceiling of the durable tier
    #[serde(rename = "max-size-mb")]
    pub max_size_mb: u64,

    /// Entry capacity of the in-process tier
    #[serde(rename = "memory-entries")]
    pub memory_entries: usize,

    /// SQLite file for the durable tier; memory-only when absent
    pub path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
            max_size_mb: 100,
            memory_entries: 256,
            path: None,
        }
    }
}

/// Browser-impersonation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StealthConfig {
    pub enabled: bool,

    /// Requests served by one user agent before rotating
    #[serde(rename = "rotate-every")]
    pub rotate_every: u32,

    /// Custom user-agent pool; the built-in pool is used when empty
    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,

    /// Base post-response pause (milliseconds); zero disables it
    #[serde(rename = "human-delay-ms")]
    pub human_delay_ms: u64,
}

impl Default for StealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rotate_every: 1,
            user_agents: Vec::new(),
            human_delay_ms: 0,
        }
    }
}

/// Static blocklist of non-content domains and file extensions
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlocklistConfig {
    pub enabled: bool,

    #[serde(rename = "ad-networks")]
    pub ad_networks: Vec<String>,

    pub analytics: Vec<String>,

    pub cdns: Vec<String>,

    #[serde(rename = "social-widgets")]
    pub social_widgets: Vec<String>,

    pub marketing: Vec<String>,

    #[serde(rename = "third-party")]
    pub third_party: Vec<String>,

    #[serde(rename = "video-players")]
    pub video_players: Vec<String>,

    pub payment: Vec<String>,

    pub other: Vec<String>,

    #[serde(rename = "skip-extensions")]
    pub skip_extensions: Vec<String>,
}

impl BlocklistConfig {
    /// Iterates every blocked domain across all categories
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.ad_networks
            .iter()
            .chain(&self.analytics)
            .chain(&self.cdns)
            .chain(&self.social_widgets)
            .chain(&self.marketing)
            .chain(&self.third_party)
            .chain(&self.video_players)
            .chain(&self.payment)
            .chain(&self.other)
            .map(String::as_str)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for BlocklistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ad_networks: strings(&[
                "doubleclick.net",
                "googlesyndication.com",
                "googleadservices.com",
                "adnxs.com",
                "adsrvr.org",
                "advertising.com",
                "criteo.com",
                "outbrain.com",
                "taboola.com",
                "amazon-adsystem.com",
                "pubmatic.com",
                "rubiconproject.com",
            ]),
            analytics: strings(&[
                "google-analytics.com",
                "googletagmanager.com",
                "hotjar.com",
                "mixpanel.com",
                "segment.com",
                "segment.io",
                "quantserve.com",
                "scorecardresearch.com",
                "chartbeat.com",
            ]),
            cdns: strings(&[
                "cloudfront.net",
                "akamaihd.net",
                "fastly.net",
                "jsdelivr.net",
                "cdnjs.cloudflare.com",
                "unpkg.com",
            ]),
            social_widgets: strings(&[
                "addthis.com",
                "sharethis.com",
                "disqus.com",
                "platform.twitter.com",
                "connect.facebook.net",
            ]),
            marketing: strings(&[
                "hubspot.com",
                "marketo.net",
                "mailchimp.com",
                "pardot.com",
            ]),
            third_party: strings(&["gravatar.com", "recaptcha.net"]),
            video_players: strings(&["jwplayer.com", "brightcove.net", "vimeocdn.com"]),
            payment: strings(&["paypal.com", "stripe.com"]),
            other: Vec::new(),
            skip_extensions: strings(&[
                ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".bmp", ".pdf", ".zip",
                ".gz", ".tar", ".rar", ".exe", ".dmg", ".mp4", ".mp3", ".avi", ".mov", ".wav",
                ".css", ".js", ".json", ".xml", ".woff", ".woff2", ".ttf", ".eot",
            ]),
        }
    }
}
