//! Integration tests for Trawler
//!
//! These tests use wiremock to stand up HTTP servers and exercise the real
//! reqwest fetcher, the fetch executor, and full crawls end-to-end.

mod crawl_tests;
mod executor_tests;
mod fetcher_tests;

use std::time::Duration;
use trawler::config::Config;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration tuned for tests: fast cadence, short retries, no robots
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.crawler.max_depth = 2;
    config.crawler.max_pages = 20;
    config.crawler.max_workers = 4;
    config.crawler.respect_robots = false;
    config.crawler.request_timeout_secs = 5;
    config.rate_limit.default_delay_ms = 10;
    config.rate_limit.min_delay_ms = 10;
    config.retry.base_delay_ms = 50;
    config.retry.max_delay_ms = 2_000;
    config
}

/// Mounts an HTML page at `route`
pub async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_response(html))
        .mount(server)
        .await;
}

pub fn html_response(html: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(html, "text/html; charset=utf-8")
}

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);
