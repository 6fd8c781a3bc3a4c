//! SQLite-backed durable cache tier

use crate::cache::entry::eviction_target;
use crate::cache::traits::{CacheResult, CacheTier, TierUsage};
use crate::cache::{CacheEntry, CacheKey};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    payload BLOB NOT NULL,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    size_bytes INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_created ON cache_entries(created_at);
CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at);
"#;

fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Durable tier persisting entries across runs
pub struct SqliteTier {
    conn: Mutex<Connection>,
    max_bytes: u64,
}

impl SqliteTier {
    /// Opens (or creates) the cache database at `path`
    pub fn open(path: &Path, max_bytes: u64) -> CacheResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        Self::with_connection(conn, max_bytes)
    }

    /// Creates an in-memory database (for testing)
    pub fn in_memory(max_bytes: u64) -> CacheResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, max_bytes)
    }

    fn with_connection(conn: Connection, max_bytes: u64) -> CacheResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            max_bytes,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn total_bytes(conn: &Connection) -> CacheResult<u64> {
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM cache_entries",
            [],
            |row| row.get(0),
        )?;
        Ok(total.max(0) as u64)
    }
}

impl CacheTier for SqliteTier {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> CacheResult<Option<CacheEntry>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT payload, created_at, expires_at, size_bytes
                 FROM cache_entries WHERE key = ?1",
                params![key.as_str()],
                |row| {
                    Ok(CacheEntry {
                        key: key.clone(),
                        payload: row.get(0)?,
                        created_at: from_millis(row.get(1)?),
                        expires_at: from_millis(row.get(2)?),
                        size_bytes: row.get::<_, i64>(3)?.max(0) as u64,
                    })
                },
            )
            .optional()?;

        match row {
            Some(entry) if entry.is_expired(now) => {
                conn.execute(
                    "DELETE FROM cache_entries WHERE key = ?1",
                    params![key.as_str()],
                )?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn put(&self, entry: CacheEntry) -> CacheResult<()> {
        self.lock().execute(
            "INSERT OR REPLACE INTO cache_entries
             (key, payload, created_at, expires_at, size_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.key.as_str(),
                entry.payload,
                to_millis(entry.created_at),
                to_millis(entry.expires_at),
                entry.size_bytes as i64
            ],
        )?;
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> CacheResult<bool> {
        let removed = self.lock().execute(
            "DELETE FROM cache_entries WHERE key = ?1",
            params![key.as_str()],
        )?;
        Ok(removed > 0)
    }

    fn evict_if_over_budget(&self) -> CacheResult<usize> {
        let mut conn = self.lock();
        let mut total = Self::total_bytes(&conn)?;
        if total <= self.max_bytes {
            return Ok(0);
        }

        let target = eviction_target(self.max_bytes);
        let tx = conn.transaction()?;
        let victims = {
            let mut stmt =
                tx.prepare("SELECT key, size_bytes FROM cache_entries ORDER BY created_at ASC")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;

            let mut victims = Vec::new();
            for row in rows {
                if total <= target {
                    break;
                }
                let (key, size) = row?;
                total = total.saturating_sub(size.max(0) as u64);
                victims.push(key);
            }
            victims
        };

        for key in &victims {
            tx.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        }
        tx.commit()?;

        Ok(victims.len())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> CacheResult<usize> {
        let removed = self.lock().execute(
            "DELETE FROM cache_entries WHERE expires_at <= ?1",
            params![to_millis(now)],
        )?;
        Ok(removed)
    }

    fn clear(&self) -> CacheResult<()> {
        self.lock().execute("DELETE FROM cache_entries", [])?;
        Ok(())
    }

    fn usage(&self, now: DateTime<Utc>) -> CacheResult<TierUsage> {
        let conn = self.lock();
        let (total, expired): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN expires_at <= ?1 THEN 1 ELSE 0 END), 0)
             FROM cache_entries",
            params![to_millis(now)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(TierUsage {
            total_entries: total.max(0) as usize,
            expired_entries: expired.max(0) as usize,
            total_bytes: Self::total_bytes(&conn)?,
            max_bytes: self.max_bytes,
        })
    }
}
