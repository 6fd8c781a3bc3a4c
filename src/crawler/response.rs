use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// One outgoing HTTP request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: "GET".to_string(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// A response, built the same way whether it came from the network or the cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: u16,
    /// Header names are stored lowercased
    pub headers: HashMap<String, String>,
    pub body: String,
    /// URL after redirects
    pub final_url: String,
    #[serde(default)]
    pub from_cache: bool,
}

impl FetchResponse {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_html(&self) -> bool {
        match self.header("content-type") {
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            }
            // Servers that omit the header are usually serving HTML
            None => true,
        }
    }
}

/// Failure to obtain any HTTP response
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("invalid request for {url}: {message}")]
    Invalid { url: String, message: String },
}

impl FetchError {
    /// Timeouts and connection failures are worth retrying
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::Invalid { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url }
            | FetchError::Connect { url, .. }
            | FetchError::Request { url, .. }
            | FetchError::Body { url, .. }
            | FetchError::Invalid { url, .. } => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(headers: &[(&str, &str)]) -> FetchResponse {
        FetchResponse {
            status: 200,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: String::new(),
            final_url: "https://example.com/".to_string(),
            from_cache: false,
        }
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let resp = response(&[("retry-after", "5"), ("X-Custom", "yes")]);
        assert_eq!(resp.header("Retry-After"), Some("5"));
        assert_eq!(resp.header("x-custom"), Some("yes"));
        assert_eq!(resp.header("missing"), None);
    }

    #[test]
    fn test_is_html() {
        assert!(response(&[("content-type", "text/html; charset=utf-8")]).is_html());
        assert!(response(&[]).is_html());
        assert!(!response(&[("content-type", "application/pdf")]).is_html());
    }

    #[test]
    fn test_request_builder() {
        let url = Url::parse("https://example.com/").unwrap();
        let request = FetchRequest::get(url)
            .with_headers(vec![("Accept".into(), "text/html".into())])
            .with_timeout(Duration::from_secs(5));
        assert!(request.is_get());
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_fetch_error_transience() {
        let timeout = FetchError::Timeout {
            url: "https://example.com/".into(),
        };
        assert!(timeout.is_transient());
        assert_eq!(timeout.url(), "https://example.com/");
        let invalid = FetchError::Invalid {
            url: "x".into(),
            message: "bad header".into(),
        };
        assert!(!invalid.is_transient());
    }
}
