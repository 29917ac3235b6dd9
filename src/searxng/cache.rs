//! Cache-aside storage for SearXNG responses
//!
//! Keys are full query URLs; values are post-processed responses.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use super::QueryResponse;

pub trait ResultCache: Send {
    fn get(&self, key: &str) -> Result<Option<QueryResponse>>;
    fn set(&self, key: &str, response: &QueryResponse) -> Result<()>;
}

// ============================================================================
// SQLite cache
// ============================================================================

/// Responses stored as JSON rows; entries older than the TTL are misses
pub struct SqliteCache {
    conn: Connection,
    ttl_secs: i64,
}

impl SqliteCache {
    pub fn open(path: &Path, ttl_secs: i64) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open search cache: {}", path.display()))?;
        Self::with_connection(conn, ttl_secs)
    }

    pub fn in_memory(ttl_secs: i64) -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory cache")?;
        Self::with_connection(conn, ttl_secs)
    }

    fn with_connection(conn: Connection, ttl_secs: i64) -> Result<Self> {
        let cache = Self { conn, ttl_secs };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS search_cache (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Drop every expired row; returns how many were removed
    pub fn purge_expired(&self) -> Result<usize> {
        let cutoff = Utc::now().timestamp() - self.ttl_secs;
        let removed = self
            .conn
            .execute("DELETE FROM search_cache WHERE created_at < ?1", params![cutoff])?;
        Ok(removed)
    }
}

impl ResultCache for SqliteCache {
    fn get(&self, key: &str) -> Result<Option<QueryResponse>> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT payload, created_at FROM search_cache WHERE key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((payload, created_at)) = row else {
            return Ok(None);
        };
        if Utc::now().timestamp() - created_at > self.ttl_secs {
            self.conn
                .execute("DELETE FROM search_cache WHERE key = ?1", [key])?;
            return Ok(None);
        }

        let response = serde_json::from_str(&payload).context("Corrupt cache entry")?;
        Ok(Some(response))
    }

    fn set(&self, key: &str, response: &QueryResponse) -> Result<()> {
        let payload = serde_json::to_string(response)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO search_cache (key, payload, created_at) VALUES (?1, ?2, ?3)",
            params![key, payload, Utc::now().timestamp()],
        )?;
        Ok(())
    }
}

// ============================================================================
// In-memory cache
// ============================================================================

/// Process-local cache with the same expiry rule as `SqliteCache`
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (i64, QueryResponse)>>,
    ttl_secs: i64,
}

impl MemoryCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_secs,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, created_at: i64, now: i64) -> bool {
        now - created_at > self.ttl_secs
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> Result<usize> {
        let mut entries = self.lock()?;
        let now = Utc::now().timestamp();
        let before = entries.len();
        entries.retain(|_, (created_at, _)| !self.is_expired(*created_at, now));
        Ok(before - entries.len())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (i64, QueryResponse)>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("cache lock poisoned"))
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<QueryResponse>> {
        let mut entries = self.lock()?;
        let now = Utc::now().timestamp();
        let expired = match entries.get(key) {
            Some((created_at, _)) => self.is_expired(*created_at, now),
            None => return Ok(None),
        };
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|(_, response)| response.clone()))
    }

    fn set(&self, key: &str, response: &QueryResponse) -> Result<()> {
        let mut entries = self.lock()?;
        let now = Utc::now().timestamp();
        entries.retain(|_, (created_at, _)| !self.is_expired(*created_at, now));
        entries.insert(key.to_string(), (now, response.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::searxng::SearxResult;
    use tempfile::TempDir;

    fn response() -> QueryResponse {
        QueryResponse {
            query: "rust".to_string(),
            number_of_results: 1,
            results: vec![SearxResult {
                url: "https://www.rust-lang.org/".to_string(),
                title: Some("Rust".to_string()),
                score: 1.5,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_sqlite_roundtrip_on_disk() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("cache/searxng.sqlite");

        {
            let cache = SqliteCache::open(&path, 60)?;
            assert!(cache.get("k")?.is_none());
            cache.set("k", &response())?;
        }

        let reopened = SqliteCache::open(&path, 60)?;
        assert_eq!(reopened.get("k")?, Some(response()));
        Ok(())
    }

    #[test]
    fn test_sqlite_expired_entry_is_miss() -> Result<()> {
        let cache = SqliteCache::in_memory(-1)?;
        cache.set("k", &response())?;
        assert!(cache.get("k")?.is_none());
        Ok(())
    }

    #[test]
    fn test_sqlite_purge_removes_stale_rows() -> Result<()> {
        let cache = SqliteCache::in_memory(60)?;
        cache.set("fresh", &response())?;
        cache.conn.execute(
            "INSERT INTO search_cache (key, payload, created_at) VALUES (?1, ?2, ?3)",
            params![
                "stale",
                serde_json::to_string(&response())?,
                Utc::now().timestamp() - 3600
            ],
        )?;

        assert_eq!(cache.purge_expired()?, 1);
        assert!(cache.get("fresh")?.is_some());
        assert!(cache.get("stale")?.is_none());
        Ok(())
    }

    #[test]
    fn test_memory_cache() -> Result<()> {
        let cache = MemoryCache::new(60);
        assert!(cache.is_empty());
        cache.set("k", &response())?;
        assert_eq!(cache.get("k")?.map(|r| r.query), Some("rust".to_string()));
        assert_eq!(cache.len(), 1);
        Ok(())
    }

    #[test]
    fn test_memory_cache_expires_entries() -> Result<()> {
        let cache = MemoryCache::new(60);
        cache.set("fresh", &response())?;
        cache
            .lock()?
            .insert("stale".to_string(), (Utc::now().timestamp() - 3600, response()));
        assert_eq!(cache.len(), 2);

        assert!(cache.get("stale")?.is_none());
        assert_eq!(cache.len(), 1);

        cache
            .lock()?
            .insert("old".to_string(), (Utc::now().timestamp() - 3600, response()));
        assert_eq!(cache.purge_expired()?, 1);
        assert!(cache.get("fresh")?.is_some());
        Ok(())
    }

    #[test]
    fn test_memory_cache_set_drops_expired() -> Result<()> {
        let cache = MemoryCache::new(-1);
        cache.set("a", &response())?;
        assert!(cache.get("a")?.is_none());
        cache.set("b", &response())?;
        cache.set("c", &response())?;
        assert_eq!(cache.len(), 1);
        Ok(())
    }
}
