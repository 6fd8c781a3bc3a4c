//! HTTP transport
//!
//! `Fetcher` is the seam between the crawl machinery and the network. The
//! engine, executor, and robots.txt check only ever see this trait, so tests
//! swap in scripted implementations.

use crate::crawler::response::{FetchError, FetchRequest, FetchResponse};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect::Policy, Client, Method};
use std::collections::HashMap;
use std::time::Duration;

const MAX_REDIRECTS: usize = 10;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Issues a single HTTP request
///
/// Any HTTP status, including 429 and 5xx, is a successful fetch. Only
/// failures to get a response at all are errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// Builds the shared HTTP client
///
/// Per-request headers (user agent included) come from the stealth profile,
/// so the client only carries transport settings.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
}

/// `Fetcher` backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(timeout)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn header_map(request: &FetchRequest) -> Result<HeaderMap, FetchError> {
    let invalid = |message: String| FetchError::Invalid {
        url: request.url.to_string(),
        message,
    };

    let mut headers = HeaderMap::with_capacity(request.headers.len());
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| invalid(format!("header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| invalid(format!("header value for '{}': {}", name, e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn classify(url: &str, error: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if error.is_timeout() {
        FetchError::Timeout { url }
    } else if error.is_connect() {
        FetchError::Connect {
            url,
            message: error.to_string(),
        }
    } else {
        FetchError::Request {
            url,
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = request.url.as_str();
        let method =
            Method::from_bytes(request.method.to_ascii_uppercase().as_bytes()).map_err(|e| {
                FetchError::Invalid {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            })?;

        let mut builder = self
            .client
            .request(method, request.url.clone())
            .headers(header_map(request)?);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| classify(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(FetchResponse {
            status,
            headers,
            body,
            final_url,
            from_cache: false,
        })
    }
}
