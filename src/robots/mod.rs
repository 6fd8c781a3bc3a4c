//! robots.txt compliance
//!
//! Each origin's robots.txt is fetched once through the crawl's `Fetcher` and
//! cached for 24 hours. A missing or unreachable file allows everything.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache, ROBOTS_TTL_HOURS};
pub use parser::RobotsRules;

use crate::crawler::{FetchRequest, Fetcher};
use crate::rate_limit::RateLimiter;
use crate::url::extract_domain;
use chrono::Utc;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .filter(|token| !token.is_empty())
        .unwrap_or(user_agent)
}

/// What robots.txt says about one URL
#[derive(Debug, Clone, PartialEq)]
pub struct RobotsVerdict {
    pub allowed: bool,
    pub crawl_delay: Option<Duration>,
}

/// Checks URLs against their origin's robots.txt
#[derive(Debug)]
pub struct RobotsGuard {
    user_agent: String,
    timeout: Duration,
    cache: Mutex<RobotsCache>,
}

impl RobotsGuard {
    /// Only the product token of `user_agent` (`trawler` in `trawler/0.1`) is
    /// matched against `User-agent` lines.
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        Self {
            user_agent: product_token(user_agent).to_string(),
            timeout,
            cache: Mutex::new(RobotsCache::default()),
        }
    }

    /// A robots.txt fetch takes a slot from `limiter` like any page request.
    pub async fn check(
        &self,
        url: &Url,
        fetcher: &dyn Fetcher,
        limiter: &RateLimiter,
    ) -> RobotsVerdict {
        let rules = self.rules_for(url, fetcher, limiter).await;
        RobotsVerdict {
            allowed: rules.is_allowed(url.as_str(), &self.user_agent),
            crawl_delay: rules.crawl_delay(&self.user_agent),
        }
    }

    async fn rules_for(
        &self,
        url: &Url,
        fetcher: &dyn Fetcher,
        limiter: &RateLimiter,
    ) -> RobotsRules {
        let origin = url.origin().ascii_serialization();

        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_at(&origin, Utc::now());
        if let Some(rules) = cached {
            return rules;
        }

        // Two workers may both miss and fetch; the later insert wins
        if let Some(domain) = extract_domain(url) {
            limiter.wait_if_needed(&domain).await;
        }
        let rules = self.fetch_rules(&origin, fetcher).await;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert_at(&origin, rules.clone(), Utc::now());
        rules
    }

    async fn fetch_rules(&self, origin: &str, fetcher: &dyn Fetcher) -> RobotsRules {
        let Ok(robots_url) = Url::parse(&format!("{}/robots.txt", origin)) else {
            return RobotsRules::allow_all();
        };

        let request = FetchRequest::get(robots_url)
            .with_headers(vec![("User-Agent".to_string(), self.user_agent.clone())])
            .with_timeout(self.timeout);

        match fetcher.fetch(&request).await {
            Ok(response) if response.is_success() => {
                debug!("Loaded robots.txt for {}", origin);
                RobotsRules::parse(&response.body)
            }
            Ok(response) => {
                debug!(
                    "robots.txt for {} returned {}, allowing all",
                    origin, response.status
                );
                RobotsRules::allow_all()
            }
            Err(e) => {
                warn!("Could not fetch robots.txt for {}: {}", origin, e);
                RobotsRules::allow_all()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{FetchError, FetchResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticRobots {
        status: u16,
        body: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for StaticRobots {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.url.path(), "/robots.txt");
            Ok(FetchResponse {
                status: self.status,
                headers: HashMap::new(),
                body: self.body.to_string(),
                final_url: request.url.to_string(),
                from_cache: false,
            })
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Fetcher for Unreachable {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
            Err(FetchError::Connect {
                url: request.url.to_string(),
                message: "refused".to_string(),
            })
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_disallowed_url_and_crawl_delay() {
        let fetcher = StaticRobots {
            status: 200,
            body: "User-agent: *\nDisallow: /private\nCrawl-delay: 2",
            calls: AtomicUsize::new(0),
        };
        let guard = RobotsGuard::new("trawler", Duration::from_secs(5));

        let verdict = guard.check(&url("https://example.com/private/x"), &fetcher, &limiter()).await;
        assert!(!verdict.allowed);
        assert_eq!(verdict.crawl_delay, Some(Duration::from_secs(2)));

        let verdict = guard.check(&url("https://example.com/news"), &fetcher, &limiter()).await;
        assert!(verdict.allowed);

        // Second check on the same origin is served from the cache
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_product_token() {
        assert_eq!(product_token("trawler/0.1.0"), "trawler");
        assert_eq!(product_token("trawler"), "trawler");
        assert_eq!(product_token("Mozilla/5.0 (X11)"), "Mozilla");
    }

    #[tokio::test]
    async fn test_agent_group_uses_product_token() {
        let fetcher = StaticRobots {
            status: 200,
            body: "User-agent: trawler\nDisallow: /\n\nUser-agent: *\nAllow: /",
            calls: AtomicUsize::new(0),
        };
        let guard = RobotsGuard::new("trawler/0.1.0", Duration::from_secs(5));
        let verdict = guard.check(&url("https://example.com/page"), &fetcher, &limiter()).await;
        assert!(!verdict.allowed);
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let fetcher = StaticRobots {
            status: 404,
            body: "User-agent: *\nDisallow: /",
            calls: AtomicUsize::new(0),
        };
        let guard = RobotsGuard::new("trawler", Duration::from_secs(5));
        let verdict = guard.check(&url("https://example.com/anything"), &fetcher, &limiter()).await;
        assert!(verdict.allowed);
        assert_eq!(verdict.crawl_delay, None);
    }

    #[tokio::test]
    async fn test_unreachable_robots_allows_all() {
        let guard = RobotsGuard::new("trawler", Duration::from_secs(5));
        let verdict = guard.check(&url("https://example.com/a"), &Unreachable, &limiter()).await;
        assert!(verdict.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_robots_fetch_takes_a_rate_limit_slot() {
        let fetcher = StaticRobots {
            status: 200,
            body: "User-agent: *\nAllow: /",
            calls: AtomicUsize::new(0),
        };
        let limiter = RateLimiter::new(Duration::from_secs(2));
        let guard = RobotsGuard::new("trawler", Duration::from_secs(5));

        guard.check(&url("https://example.com/a"), &fetcher, &limiter).await;
        let waited = limiter.wait_if_needed("example.com").await;
        assert!(waited >= Duration::from_secs(2));

        // Cached rules need no slot
        guard.check(&url("https://example.com/b"), &fetcher, &limiter).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
