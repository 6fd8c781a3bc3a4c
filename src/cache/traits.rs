//! Cache tier trait and error types

use crate::cache::{CacheEntry, CacheKey};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur inside a cache tier
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Occupancy of one tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierUsage {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub total_bytes: u64,
    pub max_bytes: u64,
}

/// One storage level of the response cache
///
/// Implementations guard their own state so a tier can be shared across
/// workers behind `&self`.
pub trait CacheTier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns a live entry; an expired entry is deleted and reported as a miss
    fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> CacheResult<Option<CacheEntry>>;

    /// Inserts or replaces an entry
    fn put(&self, entry: CacheEntry) -> CacheResult<()>;

    fn remove(&self, key: &CacheKey) -> CacheResult<bool>;

    /// Removes oldest entries until usage is at most 80% of the ceiling,
    /// once the ceiling is exceeded; returns the number removed
    fn evict_if_over_budget(&self) -> CacheResult<usize>;

    fn purge_expired(&self, now: DateTime<Utc>) -> CacheResult<usize>;

    fn clear(&self) -> CacheResult<()>;

    fn usage(&self, now: DateTime<Utc>) -> CacheResult<TierUsage>;
}
