use crate::cache::CacheKey;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

/// Eviction target as a fraction of a tier's size ceiling
pub const EVICTION_TARGET: f64 = 0.8;

/// A stored response payload with its lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub size_bytes: u64,
}

impl CacheEntry {
    /// Creates an entry expiring `ttl` after `now`
    pub fn new(key: CacheKey, payload: Vec<u8>, ttl: Duration, now: DateTime<Utc>) -> Self {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::days(36_500));
        let size_bytes = (payload.len() + key.as_str().len()) as u64;
        Self {
            key,
            payload,
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            size_bytes,
        }
    }

    /// An entry is live strictly before `expires_at`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Byte target once eviction starts
pub fn eviction_target(max_bytes: u64) -> u64 {
    (max_bytes as f64 * EVICTION_TARGET) as u64
}
