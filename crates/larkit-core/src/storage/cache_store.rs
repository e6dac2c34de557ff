//! TTL cache store trait.
//!
//! Defines the interface for the key-value store backing the token cache.
//! Implementations live in larkit-infra.

use larkit_types::error::CacheError;

/// Key-value store with per-entry expiry.
///
/// Expiry is enforced by the store: once an entry's TTL has elapsed, `has`
/// reports false and `get` returns `None`. Callers never re-check
/// timestamps themselves. Uses RPITIT (native async fn in traits).
pub trait TtlCache: Send + Sync {
    /// Whether a live entry exists for `key`.
    fn has(&self, key: &str) -> impl std::future::Future<Output = Result<bool, CacheError>> + Send;

    /// Get a live value by key. Returns None on miss or expiry.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<serde_json::Value>, CacheError>> + Send;

    /// Set a value (upsert) that expires after `ttl_secs`.
    fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
        ttl_secs: u64,
    ) -> impl std::future::Future<Output = Result<(), CacheError>> + Send;

    /// Delete a key. No-op if the key does not exist.
    fn delete(&self, key: &str)
    -> impl std::future::Future<Output = Result<(), CacheError>> + Send;
}
