use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use trawler::url::extract_domain;
///
/// let url = Url::parse("https://Sub.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the last two labels of a host (`news.example.com` -> `example.com`)
pub fn base_domain(host: &str) -> &str {
    let mut dots = host.rmatch_indices('.');
    dots.next();
    match dots.next() {
        Some((idx, _)) => &host[idx + 1..],
        None => host,
    }
}

/// Strips a leading `www.` label
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// True when `candidate` is `parent` or one of its subdomains
pub fn is_same_or_subdomain(candidate: &str, parent: &str) -> bool {
    candidate == parent
        || (candidate.len() > parent.len()
            && candidate.ends_with(parent)
            && candidate.as_bytes()[candidate.len() - parent.len() - 1] == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_base_domain() {
        assert_eq!(base_domain("news.example.com"), "example.com");
        assert_eq!(base_domain("a.b.example.com"), "example.com");
        assert_eq!(base_domain("example.com"), "example.com");
        assert_eq!(base_domain("localhost"), "localhost");
    }

    #[test]
    fn test_is_same_or_subdomain() {
        assert!(is_same_or_subdomain("example.com", "example.com"));
        assert!(is_same_or_subdomain("blog.example.com", "example.com"));
        assert!(!is_same_or_subdomain("myexample.com", "example.com"));
        assert!(!is_same_or_subdomain("example.com", "blog.example.com"));
    }

    #[test]
    fn test_strip_www() {
        assert_eq!(strip_www("www.example.com"), "example.com");
        assert_eq!(strip_www("example.com"), "example.com");
    }
}
