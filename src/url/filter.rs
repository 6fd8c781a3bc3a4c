use crate::config::{BlocklistConfig, CrawlerConfig, RelevanceConfig};
use crate::url::domain::{is_same_or_subdomain, strip_www};
use crate::url::matcher::DomainSet;
use crate::ConfigError;
use regex::Regex;
use std::fmt;
use url::Url;

/// Path fragments that mark asset-pipeline or CDN-style URLs
const ASSET_PATH_PATTERNS: &[&str] = &[
    "/assets/",
    "/static/",
    "/dist/",
    "/build/",
    "/vendor/",
    "/lib/",
    "/modules/",
    "/bundles/",
    "/_next/",
    "/.well-known/",
    "/cdn-cgi/",
    "/wp-content/plugins/",
    "/wp-content/themes/",
    "/wp-includes/",
];

/// Why a link was not accepted into the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterReason {
    Scheme(String),
    External(String),
    NotAllowed(String),
    Blocklisted(String),
    Extension(String),
    AssetPath,
    ExcludedPattern(String),
    PathTooDeep(usize),
    TooManyQueryParams(usize),
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterReason::Scheme(s) => write!(f, "unsupported scheme {}", s),
            FilterReason::External(d) => write!(f, "external domain {}", d),
            FilterReason::NotAllowed(d) => write!(f, "domain {} not in allowed-domains", d),
            FilterReason::Blocklisted(d) => write!(f, "blocklisted by {}", d),
            FilterReason::Extension(e) => write!(f, "skipped extension {}", e),
            FilterReason::AssetPath => write!(f, "asset path"),
            FilterReason::ExcludedPattern(p) => write!(f, "matches excluded pattern {}", p),
            FilterReason::PathTooDeep(n) => write!(f, "path depth {}", n),
            FilterReason::TooManyQueryParams(n) => write!(f, "{} query parameters", n),
        }
    }
}

/// Limits on URL shape applied in relevance mode
#[derive(Debug, Clone, Copy)]
pub struct ShapeLimits {
    pub max_path_depth: usize,
    pub max_query_params: usize,
}

impl From<&RelevanceConfig> for ShapeLimits {
    fn from(config: &RelevanceConfig) -> Self {
        Self {
            max_path_depth: config.max_path_depth,
            max_query_params: config.max_query_params,
        }
    }
}

/// Decides which discovered links may enter the frontier
///
/// Checks run cheapest first: scheme allow-list, domain policy, static
/// blocklist, skipped extensions, asset paths, excluded patterns, and the
/// optional shape limits.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    seed_host: String,
    follow_external: bool,
    allowed: DomainSet,
    blocked: DomainSet,
    skip_extensions: Vec<String>,
    excluded: Vec<Regex>,
    shape: Option<ShapeLimits>,
}

impl LinkFilter {
    /// Builds a filter for a crawl rooted at `seed`
    pub fn new(
        seed: &Url,
        crawler: &CrawlerConfig,
        blocklist: &BlocklistConfig,
    ) -> Result<Self, ConfigError> {
        let excluded = crawler
            .excluded_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidPattern(format!("{}: {}", p, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (blocked, skip_extensions) = if blocklist.enabled {
            (
                DomainSet::new(blocklist.domains()),
                blocklist
                    .skip_extensions
                    .iter()
                    .map(|e| e.to_lowercase())
                    .collect(),
            )
        } else {
            (DomainSet::default(), Vec::new())
        };

        Ok(Self {
            seed_host: strip_www(seed.host_str().unwrap_or_default()).to_lowercase(),
            follow_external: crawler.follow_external,
            allowed: DomainSet::new(&crawler.allowed_domains),
            blocked,
            skip_extensions,
            excluded,
            shape: None,
        })
    }

    /// Enables path-depth and query-parameter limits
    pub fn with_shape_limits(mut self, limits: ShapeLimits) -> Self {
        self.shape = Some(limits);
        self
    }

    /// Returns `Ok(())` when the (normalized) link may be enqueued
    pub fn check(&self, url: &Url) -> Result<(), FilterReason> {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(FilterReason::Scheme(scheme.to_string()));
        }

        let host = url.host_str().unwrap_or_default();
        if !self.follow_external {
            if !is_same_or_subdomain(strip_www(host), &self.seed_host) {
                return Err(FilterReason::External(host.to_string()));
            }
        } else if !self.allowed.is_empty() && !self.allowed.contains(host) {
            return Err(FilterReason::NotAllowed(host.to_string()));
        }

        if let Some(entry) = self.blocked.matching(host) {
            return Err(FilterReason::Blocklisted(entry.to_string()));
        }

        let path = url.path().to_lowercase();
        if let Some(ext) = self.skip_extensions.iter().find(|ext| path.ends_with(ext.as_str())) {
            return Err(FilterReason::Extension(ext.clone()));
        }

        let dir_path = format!("{}/", path);
        if ASSET_PATH_PATTERNS.iter().any(|p| dir_path.contains(p)) {
            return Err(FilterReason::AssetPath);
        }

        if let Some(re) = self.excluded.iter().find(|re| re.is_match(url.as_str())) {
            return Err(FilterReason::ExcludedPattern(re.as_str().to_string()));
        }

        if let Some(limits) = self.shape {
            let depth = url
                .path_segments()
                .map(|segments| segments.filter(|s| !s.is_empty()).count())
                .unwrap_or(0);
            if depth > limits.max_path_depth {
                return Err(FilterReason::PathTooDeep(depth));
            }

            let params = url.query_pairs().count();
            if params > limits.max_query_params {
                return Err(FilterReason::TooManyQueryParams(params));
            }
        }

        Ok(())
    }

    pub fn accepts(&self, url: &Url) -> bool {
        self.check(url).is_ok()
    }
}
