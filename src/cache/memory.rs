//! In-process cache tier

use crate::cache::entry::eviction_target;
use crate::cache::traits::{CacheResult, CacheTier, TierUsage};
use crate::cache::{CacheEntry, CacheKey};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<CacheKey, CacheEntry>,
    total_bytes: u64,
}

impl Entries {
    fn insert(&mut self, entry: CacheEntry) {
        self.total_bytes += entry.size_bytes;
        if let Some(old) = self.map.insert(entry.key.clone(), entry) {
            self.total_bytes -= old.size_bytes;
        }
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let removed = self.map.remove(key)?;
        self.total_bytes -= removed.size_bytes;
        Some(removed)
    }

    /// Removes oldest entries while `over` holds
    fn evict_oldest_while(&mut self, over: impl Fn(&Self) -> bool) -> usize {
        if !over(self) {
            return 0;
        }

        let mut by_age: Vec<(DateTime<Utc>, CacheKey)> = self
            .map
            .values()
            .map(|e| (e.created_at, e.key.clone()))
            .collect();
        by_age.sort();

        let mut removed = 0;
        for (_, key) in by_age {
            if !over(self) {
                break;
            }
            self.remove(&key);
            removed += 1;
        }
        removed
    }
}

/// HashMap-backed tier bounded by entry count and bytes
#[derive(Debug)]
pub struct MemoryTier {
    entries: Mutex<Entries>,
    max_entries: usize,
    max_bytes: u64,
}

impl MemoryTier {
    pub fn new(max_entries: usize, max_bytes: u64) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            max_entries: max_entries.max(1),
            max_bytes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheTier for MemoryTier {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> CacheResult<Option<CacheEntry>> {
        let mut entries = self.lock();
        match entries.map.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.clone())),
            None => Ok(None),
        }
    }

    fn put(&self, entry: CacheEntry) -> CacheResult<()> {
        let mut entries = self.lock();
        entries.insert(entry);

        let max_entries = self.max_entries;
        entries.evict_oldest_while(|e| e.map.len() > max_entries);
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> CacheResult<bool> {
        Ok(self.lock().remove(key).is_some())
    }

    fn evict_if_over_budget(&self) -> CacheResult<usize> {
        let mut entries = self.lock();
        if entries.total_bytes <= self.max_bytes {
            return Ok(0);
        }
        let target = eviction_target(self.max_bytes);
        Ok(entries.evict_oldest_while(|e| e.total_bytes > target))
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> CacheResult<usize> {
        let mut entries = self.lock();
        let expired: Vec<CacheKey> = entries
            .map
            .values()
            .filter(|e| e.is_expired(now))
            .map(|e| e.key.clone())
            .collect();
        for key in &expired {
            entries.remove(key);
        }
        Ok(expired.len())
    }

    fn clear(&self) -> CacheResult<()> {
        let mut entries = self.lock();
        entries.map.clear();
        entries.total_bytes = 0;
        Ok(())
    }

    fn usage(&self, now: DateTime<Utc>) -> CacheResult<TierUsage> {
        let entries = self.lock();
        Ok(TierUsage {
            total_entries: entries.map.len(),
            expired_entries: entries.map.values().filter(|e| e.is_expired(now)).count(),
            total_bytes: entries.total_bytes,
            max_bytes: self.max_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    fn entry(url: &str, bytes: usize, ttl_secs: u64, created: DateTime<Utc>) -> CacheEntry {
        CacheEntry::new(
            CacheKey::for_get(url),
            vec![b'x'; bytes],
            Duration::from_secs(ttl_secs),
            created,
        )
    }

    #[test]
    fn test_put_then_get() {
        let tier = MemoryTier::new(10, 1 << 20);
        let now = Utc::now();
        tier.put(entry("https://a.com/", 10, 60, now)).unwrap();

        let hit = tier.get(&CacheKey::for_get("https://a.com/"), now).unwrap();
        assert_eq!(hit.unwrap().payload, vec![b'x'; 10]);
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let tier = MemoryTier::new(10, 1 << 20);
        let now = Utc::now();
        tier.put(entry("https://a.com/", 10, 60, now)).unwrap();

        let later = now + ChronoDuration::seconds(61);
        assert!(tier
            .get(&CacheKey::for_get("https://a.com/"), later)
            .unwrap()
            .is_none());
        assert!(tier.is_empty());
    }

    #[test]
    fn test_entry_cap_drops_oldest() {
        let tier = MemoryTier::new(2, 1 << 20);
        let t0 = Utc::now();
        tier.put(entry("https://a.com/1", 1, 60, t0)).unwrap();
        tier.put(entry("https://a.com/2", 1, 60, t0 + ChronoDuration::seconds(1))).unwrap();
        tier.put(entry("https://a.com/3", 1, 60, t0 + ChronoDuration::seconds(2))).unwrap();

        let now = t0 + ChronoDuration::seconds(3);
        assert_eq!(tier.len(), 2);
        assert!(tier.get(&CacheKey::for_get("https://a.com/1"), now).unwrap().is_none());
        assert!(tier.get(&CacheKey::for_get("https://a.com/3"), now).unwrap().is_some());
    }

    #[test]
    fn test_byte_budget_evicts_to_eighty_percent() {
        // Each entry is 64 key bytes + 36 payload bytes = 100 bytes
        let tier = MemoryTier::new(100, 1000);
        let t0 = Utc::now();
        for i in 0..11 {
            tier.put(entry(
                &format!("https://a.com/{}", i),
                36,
                600,
                t0 + ChronoDuration::seconds(i),
            ))
            .unwrap();
        }

        let removed = tier.evict_if_over_budget().unwrap();
        assert_eq!(removed, 3);
        let usage = tier.usage(t0).unwrap();
        assert_eq!(usage.total_bytes, 800);
        assert!(tier
            .get(&CacheKey::for_get("https://a.com/0"), t0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_under_budget_evicts_nothing() {
        let tier = MemoryTier::new(100, 1000);
        tier.put(entry("https://a.com/", 36, 60, Utc::now())).unwrap();
        assert_eq!(tier.evict_if_over_budget().unwrap(), 0);
    }

    #[test]
    fn test_replacing_entry_keeps_byte_count() {
        let tier = MemoryTier::new(10, 1 << 20);
        let now = Utc::now();
        tier.put(entry("https://a.com/", 36, 60, now)).unwrap();
        tier.put(entry("https://a.com/", 36, 60, now)).unwrap();
        assert_eq!(tier.usage(now).unwrap().total_bytes, 100);
    }
}
