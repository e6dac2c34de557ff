//! SQLite TTL cache.
//!
//! Implements `TtlCache` from `larkit-core`. Values are stored as JSON text
//! with an absolute `expires_at` (unix seconds). Reads never return an entry
//! at or past its expiry; an expired entry found by `get` is deleted.

use chrono::Utc;
use larkit_core::storage::TtlCache;
use larkit_types::error::CacheError;
use sqlx::Row;
use tracing::debug;

use super::pool::DatabasePool;

pub struct SqliteTtlCache {
    pool: DatabasePool,
}

impl SqliteTtlCache {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Delete every expired entry, returning how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| CacheError::Query(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

impl TtlCache for SqliteTtlCache {
    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        let row = sqlx::query("SELECT 1 FROM cache_entries WHERE key = ? AND expires_at > ?")
            .bind(key)
            .bind(Utc::now().timestamp())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| CacheError::Query(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let now = Utc::now().timestamp();
        let row = sqlx::query("SELECT value, expires_at FROM cache_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| CacheError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: i64 = row
            .try_get("expires_at")
            .map_err(|e| CacheError::Query(e.to_string()))?;
        if expires_at <= now {
            debug!(key, "dropping expired cache entry");
            sqlx::query("DELETE FROM cache_entries WHERE key = ? AND expires_at <= ?")
                .bind(key)
                .bind(now)
                .execute(&self.pool.writer)
                .await
                .map_err(|e| CacheError::Query(e.to_string()))?;
            return Ok(None);
        }

        let value_str: String = row
            .try_get("value")
            .map_err(|e| CacheError::Query(e.to_string()))?;
        let value = serde_json::from_str(&value_str)
            .map_err(|e| CacheError::InvalidValue(format!("invalid JSON value: {e}")))?;
        Ok(Some(value))
    }

    async fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        let now = Utc::now();
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        let expires_at = now.timestamp().saturating_add(ttl);
        let value_str = serde_json::to_string(value)
            .map_err(|e| CacheError::InvalidValue(format!("failed to serialize value: {e}")))?;

        sqlx::query(
            r#"INSERT INTO cache_entries (key, value, expires_at, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (key) DO UPDATE SET value = excluded.value,
                   expires_at = excluded.expires_at, updated_at = excluded.updated_at"#,
        )
        .bind(key)
        .bind(&value_str)
        .bind(expires_at)
        .bind(now.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| CacheError::Query(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| CacheError::Query(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::database_url;

    async fn test_cache() -> (SqliteTtlCache, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cache.db");
        let pool = DatabasePool::new(&database_url(&db_path.display().to_string()))
            .await
            .unwrap();
        (SqliteTtlCache::new(pool), dir)
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let (cache, _dir) = test_cache().await;
        let value = serde_json::json!({"access_token": "abc123", "expires_in": 7200});

        cache.set("k", &value, 7200).await.unwrap();

        assert!(cache.has("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let (cache, _dir) = test_cache().await;
        assert!(!cache.has("missing").await.unwrap());
        assert!(cache.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_upserts() {
        let (cache, _dir) = test_cache().await;
        cache.set("k", &serde_json::json!(1), 60).await.unwrap();
        cache.set("k", &serde_json::json!(2), 60).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(serde_json::json!(2)));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_never_live_and_is_soft_deleted() {
        let (cache, _dir) = test_cache().await;
        cache.set("k", &serde_json::json!("v"), 0).await.unwrap();

        assert!(!cache.has("k").await.unwrap());
        assert!(cache.get("k").await.unwrap().is_none());

        let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cache_entries")
            .fetch_one(&cache.pool.reader)
            .await
            .unwrap();
        assert_eq!(remaining.0, 0);
    }

    #[tokio::test]
    async fn test_delete_and_purge() {
        let (cache, _dir) = test_cache().await;
        cache.set("live", &serde_json::json!(1), 60).await.unwrap();
        cache.set("dead", &serde_json::json!(2), 0).await.unwrap();

        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        cache.delete("live").await.unwrap();
        cache.delete("never-existed").await.unwrap();
        assert!(!cache.has("live").await.unwrap());
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = database_url(&dir.path().join("persist.db").display().to_string());

        let cache = SqliteTtlCache::new(DatabasePool::new(&url).await.unwrap());
        cache.set("k", &serde_json::json!("v"), 60).await.unwrap();
        drop(cache);

        let reopened = SqliteTtlCache::new(DatabasePool::new(&url).await.unwrap());
        assert_eq!(
            reopened.get("k").await.unwrap(),
            Some(serde_json::json!("v"))
        );
    }
}
