use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Request headers that change the representation a server returns
///
/// Credentials (`Cookie`, `Authorization`) and per-request stealth headers are
/// never part of a key.
const KEYED_HEADERS: &[&str] = &["accept", "accept-language", "content-type", "range"];

#[derive(Serialize)]
struct KeyMaterial<'a> {
    url: &'a str,
    method: String,
    headers: BTreeMap<String, &'a str>,
}

/// Content address of a cached response
///
/// Hex SHA-256 over a canonical JSON rendering of URL, method and keyed
/// headers, so header order and case do not matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a GET of `url` with no keyed headers
    ///
    /// Crawl fetches are keyed this way. Their `Accept` and `Accept-Language`
    /// values rotate with the stealth profile, so keying on them would store
    /// one page under several keys.
    pub fn for_get(url: &str) -> Self {
        Self::new("GET", url, &[])
    }

    pub fn new(method: &str, url: &str, headers: &[(String, String)]) -> Self {
        let material = KeyMaterial {
            url,
            method: method.to_uppercase(),
            headers: headers
                .iter()
                .map(|(name, value)| (name.to_lowercase(), value.as_str()))
                .filter(|(name, _)| KEYED_HEADERS.contains(&name.as_str()))
                .collect(),
        };

        // Serializing strings and maps into a Vec cannot fail
        let canonical = serde_json::to_vec(&material).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps an already-computed digest, e.g. one read back from storage
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_key_is_hex_sha256() {
        let key = CacheKey::for_get("https://example.com/");
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_method_and_url_distinguish_keys() {
        let url = "https://example.com/a";
        assert_ne!(CacheKey::new("GET", url, &[]), CacheKey::new("HEAD", url, &[]));
        assert_ne!(
            CacheKey::for_get(url),
            CacheKey::for_get("https://example.com/b")
        );
        assert_eq!(CacheKey::new("get", url, &[]), CacheKey::for_get(url));
    }

    #[test]
    fn test_credentials_do_not_affect_key() {
        let url = "https://example.com/a";
        let plain = CacheKey::for_get(url);
        let with_creds = CacheKey::new(
            "GET",
            url,
            &headers(&[("Cookie", "session=1"), ("Authorization", "Bearer x")]),
        );
        assert_eq!(plain, with_creds);
    }

    #[test]
    fn test_keyed_headers_are_order_and_case_insensitive() {
        let url = "https://example.com/a";
        let a = CacheKey::new(
            "GET",
            url,
            &headers(&[("Accept", "text/html"), ("Accept-Language", "en")]),
        );
        let b = CacheKey::new(
            "GET",
            url,
            &headers(&[("accept-language", "en"), ("ACCEPT", "text/html")]),
        );
        assert_eq!(a, b);
        assert_ne!(a, CacheKey::for_get(url));
    }

    #[test]
    fn test_volatile_headers_ignored() {
        let url = "https://example.com/a";
        let key = CacheKey::new("GET", url, &headers(&[("User-Agent", "Mozilla/5.0")]));
        assert_eq!(key, CacheKey::for_get(url));
    }
}
