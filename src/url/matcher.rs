use std::collections::HashSet;

/// Checks if a domain matches a wildcard pattern
///
/// `"example.com"` matches only itself; `"*.example.com"` matches the bare
/// domain and any subdomain at any depth.
///
/// ```
/// use trawler::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "myexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Set of domains matched by suffix walk
///
/// A host matches when it, or any parent obtained by dropping leading
/// labels, is in the set: `ads.doubleclick.net` matches `doubleclick.net`.
#[derive(Debug, Clone, Default)]
pub struct DomainSet {
    domains: HashSet<String>,
}

impl DomainSet {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim().trim_start_matches("*.").to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Returns the entry matching `host`, if any
    pub fn matching(&self, host: &str) -> Option<&str> {
        let mut rest = host;
        loop {
            if let Some(hit) = self.domains.get(rest) {
                return Some(hit.as_str());
            }
            match rest.split_once('.') {
                Some((_, parent)) if !parent.is_empty() => rest = parent,
                _ => return None,
            }
        }
    }

    pub fn contains(&self, host: &str) -> bool {
        self.matching(host).is_some()
    }
}
