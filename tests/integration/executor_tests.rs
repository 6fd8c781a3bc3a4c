use crate::{html_response, test_config, TEST_TIMEOUT};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use trawler::cache::ResponseCache;
use trawler::config::CacheConfig;
use trawler::crawler::{FetchExecutor, HttpFetcher};
use trawler::{RateLimiter, RetryPolicy, TrawlError};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor() -> FetchExecutor {
    let retry = RetryPolicy {
        base_delay: Duration::from_millis(50),
        ..RetryPolicy::default()
    }
    .deterministic();
    FetchExecutor::new(
        Arc::new(HttpFetcher::new(TEST_TIMEOUT).unwrap()),
        Arc::new(RateLimiter::new(Duration::ZERO)),
    )
    .with_retry_policy(retry)
    .with_timeout(TEST_TIMEOUT)
}

#[tokio::test]
async fn test_retry_after_is_honored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(html_response("<p>finally</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor();
    let url = Url::parse(&format!("{}/busy", server.uri())).unwrap();

    let started = Instant::now();
    let response = executor.execute(&url, None).await.unwrap();

    assert_eq!(response.status, 200);
    assert!(response.body.contains("finally"));
    // Retry-After of 1s with the 10% safety margin
    assert!(started.elapsed() >= Duration::from_millis(1_100));

    let stats = executor.stats();
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.rate_limited, 1);
    assert_eq!(stats.retries, 1);
}

#[tokio::test]
async fn test_persistent_429_gives_up_with_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/closed"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let retry = RetryPolicy {
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        rate_limit_retries: 2,
        ..RetryPolicy::default()
    }
    .deterministic();
    let executor = executor().with_retry_policy(retry);
    let url = Url::parse(&format!("{}/closed", server.uri())).unwrap();

    let error = executor.execute(&url, None).await.unwrap_err();

    assert!(matches!(error, TrawlError::RateLimited { attempts: 3, .. }));
    assert_eq!(executor.stats().requests, 3);
    assert_eq!(executor.stats().errors, 1);
}

#[tokio::test]
async fn test_cache_hit_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(html_response("<title>Cached</title>"))
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(ResponseCache::from_config(&CacheConfig::default()).unwrap());
    let executor = executor().with_cache(cache);
    let url = Url::parse(&format!("{}/article", server.uri())).unwrap();

    let first = executor.execute(&url, None).await.unwrap();
    let second = executor.execute(&url, None).await.unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.body, second.body);

    let stats = executor.stats();
    assert_eq!(stats.requests, 1);
    assert_eq!(stats.cache_hits, 1);
}

#[tokio::test]
async fn test_durable_cache_survives_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stable"))
        .respond_with(html_response("<p>keep me</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = CacheConfig {
        path: Some(dir.path().join("cache.db").to_string_lossy().into_owned()),
        ..CacheConfig::default()
    };
    let url = Url::parse(&format!("{}/stable", server.uri())).unwrap();

    {
        let cache = Arc::new(ResponseCache::from_config(&config).unwrap());
        let response = executor().with_cache(cache).execute(&url, None).await.unwrap();
        assert!(!response.from_cache);
    }

    let cache = Arc::new(ResponseCache::from_config(&config).unwrap());
    let executor = executor().with_cache(Arc::clone(&cache));
    let response = executor.execute(&url, None).await.unwrap();

    assert!(response.from_cache);
    assert!(response.body.contains("keep me"));
    assert_eq!(cache.stats().unwrap().durable_hits, 1);
}

#[tokio::test]
async fn test_error_responses_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config();
    let cache = Arc::new(ResponseCache::from_config(&config.cache).unwrap());
    let executor = executor().with_cache(cache);
    let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();

    assert_eq!(executor.execute(&url, None).await.unwrap().status, 404);
    assert_eq!(executor.execute(&url, None).await.unwrap().status, 404);
    assert_eq!(executor.stats().cache_hits, 0);
}
