use crate::UrlError;
use url::Url;

/// Tracking query parameters removed during normalization
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "_ga", "_hsenc", "_hsmi", "igshid",
];

/// Normalizes a URL into the identity used by the frontier and visited set
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject schemes other than http and https
/// 3. Lowercase the host (the `url` crate also drops default ports)
/// 4. Normalize path:
///    - Remove dot segments (. and ..) and empty segments
///    - Remove trailing slash (except for root /)
/// 5. Remove fragment
/// 6. Remove tracking query parameters (`utm_*` and friends)
/// 7. Sort remaining query parameters by key, then value
/// 8. Remove empty query string
///
/// # Examples
///
/// ```
/// use trawler::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/news/?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/news?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    if host.is_empty() {
        return Err(UrlError::MissingDomain);
    }
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Normalizes a URL and returns its string identity
pub fn normalize_str(url_str: &str) -> Result<String, UrlError> {
    normalize_url(url_str).map(String::from)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_preserved() {
        let result = normalize_url("http://example.com/page").unwrap();
        assert_eq!(result.as_str(), "http://example.com/page");
    }

    #[test]
    fn test_www_is_a_distinct_host() {
        let result = normalize_url("https://WWW.Example.com/").unwrap();
        assert_eq!(result.as_str(), "https://www.example.com/");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.com/page/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_root_slash() {
        assert_eq!(
            normalize_url("https://example.com").unwrap().as_str(),
            "https://example.com/"
        );
        assert_eq!(
            normalize_url("https://example.com/").unwrap().as_str(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_sort_query_params() {
        let result = normalize_url("https://example.com/page?b=2&a=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?a=1&b=2");
    }

    #[test]
    fn test_tracking_params_removed() {
        let result = normalize_url(
            "https://example.com/page?keep=yes&utm_medium=email&another=value&fbclid=123",
        )
        .unwrap();
        assert_eq!(
            result.as_str(),
            "https://example.com/page?another=value&keep=yes"
        );

        let result = normalize_url("https://example.com/page?utm_source=a&gclid=c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_dot_segments_and_slashes() {
        assert_eq!(
            normalize_url("https://example.com/a/../b/./c").unwrap().as_str(),
            "https://example.com/b/c"
        );
        assert_eq!(
            normalize_url("https://example.com///path//to///page").unwrap().as_str(),
            "https://example.com/path/to/page"
        );
    }

    #[test]
    fn test_path_case_preserved() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_default_port_dropped() {
        let result = normalize_url("https://example.com:443/x").unwrap();
        assert_eq!(result.as_str(), "https://example.com/x");
        let result = normalize_url("http://localhost:8080/x").unwrap();
        assert_eq!(result.as_str(), "http://localhost:8080/x");
    }

    #[test]
    fn test_equivalent_urls_share_identity() {
        let a = normalize_str("https://example.com/news/a/?y=1&x=2#c").unwrap();
        let b = normalize_str("https://Example.com/news/./a?x=2&y=1").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        assert!(matches!(
            normalize_url("not a url"),
            Err(UrlError::Parse(_))
        ));
    }
}
