use crate::robots::RobotsRules;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// How long a fetched robots.txt stays authoritative
pub const ROBOTS_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub rules: RobotsRules,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(rules: RobotsRules, fetched_at: DateTime<Utc>) -> Self {
        Self { rules, fetched_at }
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at > Duration::hours(ROBOTS_TTL_HOURS)
    }
}

/// robots.txt rules keyed by `scheme://host[:port]`
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: HashMap<String, CachedRobots>,
}

impl RobotsCache {
    /// Fresh rules for `origin`, dropping a stale entry
    pub fn get_at(&mut self, origin: &str, now: DateTime<Utc>) -> Option<RobotsRules> {
        match self.entries.get(origin) {
            Some(cached) if !cached.is_stale_at(now) => Some(cached.rules.clone()),
            Some(_) => {
                self.entries.remove(origin);
                None
            }
            None => None,
        }
    }

    pub fn insert_at(&mut self, origin: &str, rules: RobotsRules, now: DateTime<Utc>) {
        self.entries
            .insert(origin.to_string(), CachedRobots::new(rules, now));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://example.com";

    #[test]
    fn test_fresh_entry_is_returned() {
        let now = Utc::now();
        let mut cache = RobotsCache::default();
        cache.insert_at(ORIGIN, RobotsRules::parse("User-agent: *\nDisallow: /x"), now);

        let rules = cache.get_at(ORIGIN, now + Duration::hours(23)).unwrap();
        assert!(!rules.is_allow_all());
    }

    #[test]
    fn test_stale_entry_is_dropped() {
        let now = Utc::now();
        let mut cache = RobotsCache::default();
        cache.insert_at(ORIGIN, RobotsRules::allow_all(), now);

        assert!(cache.get_at(ORIGIN, now + Duration::hours(25)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unknown_origin() {
        let mut cache = RobotsCache::default();
        assert!(cache.get_at(ORIGIN, Utc::now()).is_none());
    }
}
