//! One logical fetch: cache, rate limit, retry, stealth headers

use crate::cache::{CacheKey, ResponseCache};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::response::{FetchError, FetchRequest, FetchResponse};
use crate::rate_limit::RateLimiter;
use crate::retry::{parse_retry_after, Outcome, RetryDecision, RetryPolicy, RetryState};
use crate::stealth::StealthProfile;
use crate::url::extract_domain;
use crate::{ErrorKind, TrawlError, UrlError};
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Counters across every fetch an executor has run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    /// Network requests issued, retries included
    pub requests: u64,
    pub cache_hits: u64,
    pub retries: u64,
    /// Fetches that gave up
    pub errors: u64,
    /// HTTP 429 responses received
    pub rate_limited: u64,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    retries: AtomicU64,
    errors: AtomicU64,
    rate_limited: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Issues requests on behalf of the crawl engine
///
/// The executor owns no crawl state; several workers share one instance.
pub struct FetchExecutor {
    fetcher: Arc<dyn Fetcher>,
    limiter: Arc<RateLimiter>,
    cache: Option<Arc<ResponseCache>>,
    retry: RetryPolicy,
    stealth: StealthProfile,
    timeout: Duration,
    counters: Counters,
}

impl std::fmt::Debug for FetchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchExecutor")
            .field("cache", &self.cache.is_some())
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl FetchExecutor {
    /// Executor with no cache, the default retry policy, and plain headers
    pub fn new(fetcher: Arc<dyn Fetcher>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            fetcher,
            limiter,
            cache: None,
            retry: RetryPolicy::default(),
            stealth: StealthProfile::plain(concat!("trawler/", env!("CARGO_PKG_VERSION"))),
            timeout: DEFAULT_TIMEOUT,
            counters: Counters::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_stealth(mut self, stealth: StealthProfile) -> Self {
        self.stealth = stealth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_deref()
    }

    pub fn stats(&self) -> ExecutorStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ExecutorStats {
            requests: load(&self.counters.requests),
            cache_hits: load(&self.counters.cache_hits),
            retries: load(&self.counters.retries),
            errors: load(&self.counters.errors),
            rate_limited: load(&self.counters.rate_limited),
        }
    }

    /// Fetches `url`, from the cache when possible
    ///
    /// Every network attempt waits on the domain's rate limit first. A cache
    /// hit issues no request and takes no rate-limit slot. Any HTTP status
    /// that is not retried is returned as a response; errors mean no usable
    /// response was obtained.
    pub async fn execute(
        &self,
        url: &Url,
        referer: Option<&str>,
    ) -> Result<FetchResponse, TrawlError> {
        let domain = extract_domain(url).ok_or(UrlError::MissingDomain)?;
        let key = CacheKey::for_get(url.as_str());

        if let Some(cached) = self.lookup(&key) {
            bump(&self.counters.cache_hits);
            debug!("Cache hit for {}", url);
            return Ok(cached);
        }

        let mut state = RetryState::default();
        loop {
            self.limiter.wait_if_needed(&domain).await;

            let request = FetchRequest::get(url.clone())
                .with_headers(self.stealth.headers_for(referer))
                .with_timeout(self.timeout);
            bump(&self.counters.requests);

            let result = match tokio::time::timeout(self.timeout, self.fetcher.fetch(&request)).await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    url: url.to_string(),
                }),
            };

            let outcome = match &result {
                Ok(response) => {
                    let retry_after = response
                        .header("retry-after")
                        .and_then(|v| parse_retry_after(v, Utc::now()));
                    Outcome::from_status(response.status, retry_after)
                }
                Err(e) if e.is_transient() => Outcome::Transient,
                Err(_) => Outcome::ClientError(0),
            };
            self.record_feedback(&domain, &outcome);

            if result.is_ok() {
                self.stealth.human_delay().pause().await;
            }

            match self.retry.decide(&outcome, &mut state) {
                RetryDecision::Done => {
                    let response = result.map_err(|e| network_error(url, None, &e))?;
                    self.store(key, url, &response);
                    return Ok(response);
                }
                RetryDecision::Retry(delay) => {
                    bump(&self.counters.retries);
                    warn!(
                        "Retrying {} in {:.1}s after {}",
                        url,
                        delay.as_secs_f64(),
                        describe(&outcome, &result)
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp(kind) => {
                    return self.give_up(kind, url, domain, &state, result);
                }
            }
        }
    }

    fn give_up(
        &self,
        kind: ErrorKind,
        url: &Url,
        domain: String,
        state: &RetryState,
        result: Result<FetchResponse, FetchError>,
    ) -> Result<FetchResponse, TrawlError> {
        let error = match (kind, result) {
            (ErrorKind::RateLimit, _) => TrawlError::RateLimited {
                domain,
                attempts: state.rate_limit_retries + 1,
            },
            // Non-retryable statuses (404, 403, ...) are still responses
            (_, Ok(response)) if response.status < 500 => return Ok(response),
            (_, Ok(response)) => TrawlError::Network {
                url: url.to_string(),
                status: Some(response.status),
                message: format!(
                    "HTTP {} after {} retries",
                    response.status, state.retries
                ),
            },
            (_, Err(e)) => network_error(url, None, &e),
        };
        bump(&self.counters.errors);
        Err(error)
    }

    fn lookup(&self, key: &CacheKey) -> Option<FetchResponse> {
        let cache = self.cache.as_ref()?;
        match cache.get_response(key) {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Cache read failed: {}", e);
                None
            }
        }
    }

    /// Only complete 200 responses are cached
    fn store(&self, key: CacheKey, url: &Url, response: &FetchResponse) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        if response.status != 200 {
            return;
        }
        if let Err(e) = cache.put_response(key, response, cache.ttl_for_url(url.as_str())) {
            warn!("Cache write failed for {}: {}", url, e);
        }
    }

    fn record_feedback(&self, domain: &str, outcome: &Outcome) {
        match outcome {
            Outcome::Success => self.limiter.record_success(domain),
            Outcome::RateLimited { .. } => {
                bump(&self.counters.rate_limited);
                self.limiter.record_failure(domain, true);
            }
            Outcome::Transient | Outcome::ServerError(_) => {
                self.limiter.record_failure(domain, false)
            }
            Outcome::ClientError(_) => {}
        }
    }
}

fn network_error(url: &Url, status: Option<u16>, error: &FetchError) -> TrawlError {
    TrawlError::Network {
        url: url.to_string(),
        status,
        message: error.to_string(),
    }
}

fn describe(outcome: &Outcome, result: &Result<FetchResponse, FetchError>) -> String {
    match (outcome, result) {
        (Outcome::RateLimited { retry_after: Some(after) }, _) => {
            format!("HTTP 429 (Retry-After {:.1}s)", after.as_secs_f64())
        }
        (_, Ok(response)) => format!("HTTP {}", response.status),
        (_, Err(e)) => e.to_string(),
    }
}
