//! In-process TTL cache.
//!
//! DashMap-backed; each entry carries an `Instant` deadline. Lookups treat
//! an entry at or past its deadline as absent and remove it.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use larkit_core::storage::TtlCache;
use larkit_types::error::CacheError;

struct Entry {
    value: serde_json::Value,
    expires_at: Instant,
}

#[derive(Default)]
pub struct InMemoryTtlCache {
    entries: DashMap<String, Entry>,
}

impl InMemoryTtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn live(&self, key: &str) -> Option<serde_json::Value> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, e| e.expires_at <= now);
        }
        None
    }
}

impl TtlCache for InMemoryTtlCache {
    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.live(key).is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        Ok(self.live(key))
    }

    async fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(ttl_secs))
            .unwrap_or(now + Duration::from_secs(u32::MAX as u64));
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}
