//! Two-tier response cache
//!
//! Responses are addressed by [`CacheKey`] and stored with a TTL. The
//! in-process tier is consulted first; a hit in the durable tier is promoted
//! into it. Writes go to every tier, after which each tier evicts its oldest
//! entries if it has outgrown its size ceiling.
//!
//! # Components
//!
//! - `CacheKey`: content address of a request
//! - `CacheEntry`: stored payload with creation and expiry times
//! - `MemoryTier`: bounded in-process map
//! - `SqliteTier`: durable store shared across runs
//! - `ResponseCache`: the tiered facade used by the fetch executor

mod entry;
mod key;
mod memory;
mod sqlite;
mod traits;

pub use entry::{CacheEntry, EVICTION_TARGET};
pub use key::CacheKey;
pub use memory::MemoryTier;
pub use sqlite::SqliteTier;
pub use traits::{CacheError, CacheResult, CacheTier, TierUsage};

use crate::config::CacheConfig;
use crate::crawler::FetchResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// TTL for URLs that look like news or blog content
const NEWS_TTL: Duration = Duration::from_secs(1800);

/// TTL for URLs that look like API endpoints
const API_TTL: Duration = Duration::from_secs(300);

/// Snapshot of cache occupancy and effectiveness
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub total_bytes: u64,
    pub max_bytes: u64,
    pub usage_percent: f64,
    pub memory_hits: u64,
    pub durable_hits: u64,
    pub misses: u64,
}

/// Content-addressed response store with TTL expiry and size-bounded eviction
pub struct ResponseCache {
    tiers: Vec<Box<dyn CacheTier>>,
    default_ttl: Duration,
    memory_hits: AtomicU64,
    durable_hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Creates a cache from tiers ordered fastest first
    pub fn with_tiers(tiers: Vec<Box<dyn CacheTier>>, default_ttl: Duration) -> Self {
        Self {
            tiers,
            default_ttl,
            memory_hits: AtomicU64::new(0),
            durable_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a cache with only the in-process tier
    pub fn in_memory(max_entries: usize, max_bytes: u64, default_ttl: Duration) -> Self {
        Self::with_tiers(
            vec![Box::new(MemoryTier::new(max_entries, max_bytes))],
            default_ttl,
        )
    }

    /// Creates an in-process tier backed by a SQLite file at `path`
    pub fn tiered(
        path: &Path,
        max_entries: usize,
        max_bytes: u64,
        default_ttl: Duration,
    ) -> CacheResult<Self> {
        let durable = SqliteTier::open(path, max_bytes)?;
        Ok(Self::with_tiers(
            vec![
                Box::new(MemoryTier::new(max_entries, max_bytes)),
                Box::new(durable),
            ],
            default_ttl,
        ))
    }

    /// Builds the cache described by configuration
    pub fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        let max_bytes = config.max_size_mb.saturating_mul(1024 * 1024);
        let ttl = Duration::from_secs(config.ttl_secs);

        match &config.path {
            Some(path) => {
                info!("Opening response cache at {}", path);
                Self::tiered(Path::new(path), config.memory_entries, max_bytes, ttl)
            }
            None => Ok(Self::in_memory(config.memory_entries, max_bytes, ttl)),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// TTL for a URL: shorter for news/blog pages and API endpoints
    pub fn ttl_for_url(&self, url: &str) -> Duration {
        let lower = url.to_lowercase();
        let heuristic = if lower.contains("/api") {
            Some(API_TTL)
        } else if lower.contains("/news") || lower.contains("/blog") {
            Some(NEWS_TTL)
        } else {
            None
        };

        match heuristic {
            Some(ttl) => ttl.min(self.default_ttl),
            None => self.default_ttl,
        }
    }

    pub fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        self.get_at(key, Utc::now())
    }

    /// Looks `key` up as of `now`, fastest tier first
    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> CacheResult<Option<Vec<u8>>> {
        for (idx, tier) in self.tiers.iter().enumerate() {
            if let Some(entry) = tier.get(key, now)? {
                if idx == 0 {
                    self.memory_hits.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.durable_hits.fetch_add(1, Ordering::Relaxed);
                    for faster in &self.tiers[..idx] {
                        faster.put(entry.clone())?;
                    }
                }
                debug!("Cache hit in {} tier for {}", tier.name(), key);
                return Ok(Some(entry.payload));
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    pub fn set(&self, key: CacheKey, payload: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        self.set_at(key, payload, ttl, Utc::now())
    }

    /// Stores `payload` in every tier, then enforces size ceilings
    pub fn set_at(
        &self,
        key: CacheKey,
        payload: Vec<u8>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> CacheResult<()> {
        let entry = CacheEntry::new(key, payload, ttl, now);
        for tier in &self.tiers {
            tier.put(entry.clone())?;
        }
        self.evict_if_over_budget()?;
        Ok(())
    }

    /// Evicts oldest entries from any tier above its ceiling
    pub fn evict_if_over_budget(&self) -> CacheResult<usize> {
        let mut removed = 0;
        for tier in &self.tiers {
            let evicted = tier.evict_if_over_budget()?;
            if evicted > 0 {
                info!("Evicted {} entries from {} cache tier", evicted, tier.name());
            }
            removed += evicted;
        }
        Ok(removed)
    }

    /// Returns a cached response, decoded into the same type a live fetch yields
    pub fn get_response(&self, key: &CacheKey) -> CacheResult<Option<FetchResponse>> {
        match self.get(key)? {
            Some(payload) => {
                let mut response: FetchResponse = serde_json::from_slice(&payload)?;
                response.from_cache = true;
                Ok(Some(response))
            }
            None => Ok(None),
        }
    }

    pub fn put_response(
        &self,
        key: CacheKey,
        response: &FetchResponse,
        ttl: Duration,
    ) -> CacheResult<()> {
        let payload = serde_json::to_vec(response)?;
        self.set(key, payload, ttl)
    }

    pub fn remove(&self, key: &CacheKey) -> CacheResult<bool> {
        let mut removed = false;
        for tier in &self.tiers {
            removed |= tier.remove(key)?;
        }
        Ok(removed)
    }

    pub fn purge_expired(&self) -> CacheResult<usize> {
        let now = Utc::now();
        let mut removed = 0;
        for tier in &self.tiers {
            removed += tier.purge_expired(now)?;
        }
        Ok(removed)
    }

    pub fn clear(&self) -> CacheResult<()> {
        for tier in &self.tiers {
            tier.clear()?;
        }
        Ok(())
    }

    /// Occupancy of the slowest (most complete) tier plus hit counters
    pub fn stats(&self) -> CacheResult<CacheStats> {
        let usage = match self.tiers.last() {
            Some(tier) => tier.usage(Utc::now())?,
            None => TierUsage::default(),
        };

        let usage_percent = if usage.max_bytes > 0 {
            usage.total_bytes as f64 / usage.max_bytes as f64 * 100.0
        } else {
            0.0
        };

        Ok(CacheStats {
            total_entries: usage.total_entries,
            valid_entries: usage.total_entries - usage.expired_entries,
            expired_entries: usage.expired_entries,
            total_bytes: usage.total_bytes,
            max_bytes: usage.max_bytes,
            usage_percent,
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            durable_hits: self.durable_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field(
                "tiers",
                &self.tiers.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
