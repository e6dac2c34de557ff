//! TTL cache backends selectable from configuration.

pub mod memory;

use std::path::Path;

use larkit_core::storage::TtlCache;
use larkit_types::config::{CacheBackendKind, CacheConfig};
use larkit_types::error::CacheError;
use tracing::info;

use crate::sqlite::pool::{DatabasePool, default_database_path};
use crate::sqlite::SqliteTtlCache;

pub use memory::InMemoryTtlCache;

/// The configured cache store.
pub enum CacheBackend {
    Memory(InMemoryTtlCache),
    Sqlite(SqliteTtlCache),
}

impl CacheBackend {
    /// Open the backend named by `[cache]`.
    ///
    /// The SQLite backend creates the database's parent directory if needed.
    pub async fn open(config: &CacheConfig) -> Result<Self, CacheError> {
        match config.backend {
            CacheBackendKind::Memory => Ok(CacheBackend::Memory(InMemoryTtlCache::new())),
            CacheBackendKind::Sqlite => {
                let path = config.path.clone().unwrap_or_else(default_database_path);
                let pool = DatabasePool::open_file(Path::new(&path))
                    .await
                    .map_err(|e| CacheError::Connection(e.to_string()))?;
                info!("opened sqlite token cache");
                Ok(CacheBackend::Sqlite(SqliteTtlCache::new(pool)))
            }
        }
    }

    pub fn kind(&self) -> CacheBackendKind {
        match self {
            CacheBackend::Memory(_) => CacheBackendKind::Memory,
            CacheBackend::Sqlite(_) => CacheBackendKind::Sqlite,
        }
    }
}

impl TtlCache for CacheBackend {
    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        match self {
            CacheBackend::Memory(c) => c.has(key).await,
            CacheBackend::Sqlite(c) => c.has(key).await,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        match self {
            CacheBackend::Memory(c) => c.get(key).await,
            CacheBackend::Sqlite(c) => c.get(key).await,
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        match self {
            CacheBackend::Memory(c) => c.set(key, value, ttl_secs).await,
            CacheBackend::Sqlite(c) => c.set(key, value, ttl_secs).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            CacheBackend::Memory(c) => c.delete(key).await,
            CacheBackend::Sqlite(c) => c.delete(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_memory_backend_by_default() {
        let backend = CacheBackend::open(&CacheConfig::default()).await.unwrap();
        assert_eq!(backend.kind(), CacheBackendKind::Memory);
    }

    #[tokio::test]
    async fn opens_sqlite_backend_in_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/cache.db");
        let config = CacheConfig {
            backend: CacheBackendKind::Sqlite,
            path: Some(path.display().to_string()),
        };

        let backend = CacheBackend::open(&config).await.unwrap();
        assert_eq!(backend.kind(), CacheBackendKind::Sqlite);

        backend.set("k", &serde_json::json!(1), 60).await.unwrap();
        assert!(backend.has("k").await.unwrap());
        assert!(path.exists());
    }
}
