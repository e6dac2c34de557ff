//! Access token manager.
//!
//! Caches issued tokens in a `TtlCache` under `cache_prefix + fingerprint`,
//! where the fingerprint hashes the canonical JSON of the credential set.
//! Several credential sets can therefore share one store without key
//! collisions. Expiry is left entirely to the store.
//!
//! Concurrent cache misses for the same fingerprint each call upstream and
//! the last write wins, unless `single_flight` is enabled, in which case a
//! per-fingerprint mutex serializes issuance and later callers re-check the
//! cache after acquiring it.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use larkit_types::config::CredentialConfig;
use larkit_types::credential::CredentialSet;
use larkit_types::error::KernelError;
use larkit_types::event::KernelEvent;
use larkit_types::token::AccessToken;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::issuer::TokenIssuer;
use crate::crypto::ContentHasher;
use crate::event::EventBus;
use crate::storage::TtlCache;

/// Issuance and caching settings, taken from `[credentials]`.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub token_key: String,
    pub query_name: String,
    pub cache_prefix: String,
    pub default_lifetime_secs: u64,
    pub single_flight: bool,
}

impl From<&CredentialConfig> for TokenSettings {
    fn from(config: &CredentialConfig) -> Self {
        Self {
            token_key: config.token_key.clone(),
            query_name: config
                .query_name
                .clone()
                .unwrap_or_else(|| config.token_key.clone()),
            cache_prefix: config.cache_prefix.clone(),
            default_lifetime_secs: config.default_lifetime_secs,
            single_flight: config.single_flight,
        }
    }
}

/// Fetches, caches, and refreshes the access token for one credential set.
///
/// Generic over the issuer, cache store and fingerprint hasher so the same
/// logic runs against HTTP + SQLite in production and fakes in tests.
pub struct TokenManager<I: TokenIssuer, C: TtlCache, H: ContentHasher> {
    issuer: I,
    cache: C,
    hasher: H,
    credentials: CredentialSet,
    settings: TokenSettings,
    events: EventBus,
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl<I: TokenIssuer, C: TtlCache, H: ContentHasher> TokenManager<I, C, H> {
    pub fn new(
        issuer: I,
        cache: C,
        hasher: H,
        credentials: CredentialSet,
        settings: TokenSettings,
        events: EventBus,
    ) -> Self {
        Self {
            issuer,
            cache,
            hasher,
            credentials,
            settings,
            events,
            inflight: DashMap::new(),
        }
    }

    /// Build a manager from the `[credentials]` configuration section.
    pub fn from_config(
        issuer: I,
        cache: C,
        hasher: H,
        config: &CredentialConfig,
        events: EventBus,
    ) -> Self {
        Self::new(
            issuer,
            cache,
            hasher,
            config.values.clone(),
            TokenSettings::from(config),
            events,
        )
    }

    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Stable hash of the canonical credential serialization.
    pub fn fingerprint(&self) -> String {
        self.hasher.compute_hash(&self.credentials.canonical_json())
    }

    /// Store key for this credential set.
    pub fn cache_key(&self) -> String {
        format!("{}{}", self.settings.cache_prefix, self.fingerprint())
    }

    /// Return the cached token, or issue a new one when absent or forced.
    pub async fn get_token(&self, force_refresh: bool) -> Result<AccessToken, KernelError> {
        let key = self.cache_key();

        if !force_refresh {
            if let Some(token) = self.cached(&key).await? {
                return Ok(token);
            }
        }

        if !self.settings.single_flight {
            return self.issue_and_store(&key).await;
        }

        let lock = Arc::clone(self.inflight.entry(key.clone()).or_default().value());
        let _guard = lock.lock().await;
        // Another caller may have refreshed while we waited.
        if !force_refresh {
            if let Some(token) = self.cached(&key).await? {
                return Ok(token);
            }
        }
        self.issue_and_store(&key).await
    }

    /// Always issue a fresh token upstream.
    pub async fn refresh(&self) -> Result<AccessToken, KernelError> {
        self.get_token(true).await
    }

    /// Seed an externally obtained token, bypassing issuance.
    pub async fn set_token(
        &self,
        value: impl Into<String>,
        lifetime_secs: Option<u64>,
    ) -> Result<AccessToken, KernelError> {
        let token = AccessToken::new(
            value,
            Utc::now(),
            lifetime_secs.unwrap_or(self.settings.default_lifetime_secs),
        );
        self.store(&self.cache_key(), &token).await?;
        Ok(token)
    }

    /// Query parameters that authorize an outbound call.
    pub async fn token_query(&self) -> Result<Vec<(String, String)>, KernelError> {
        let token = self.get_token(false).await?;
        Ok(vec![(
            self.settings.query_name.clone(),
            token.value().to_string(),
        )])
    }

    /// Add the token to an outbound URL's query string.
    ///
    /// A parameter already present on the URL wins over the token.
    pub async fn apply_to_url(&self, raw: &str) -> Result<String, KernelError> {
        let mut url = Url::parse(raw)
            .map_err(|e| KernelError::BadRequest(format!("invalid url '{raw}': {e}")))?;
        let name = self.settings.query_name.as_str();
        if url.query_pairs().any(|(k, _)| k == name) {
            return Ok(url.to_string());
        }
        for (k, v) in self.token_query().await? {
            url.query_pairs_mut().append_pair(&k, &v);
        }
        Ok(url.to_string())
    }

    async fn cached(&self, key: &str) -> Result<Option<AccessToken>, KernelError> {
        let Some(value) = self.cache.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<AccessToken>(value) {
            Ok(token) => {
                debug!(key, "access token cache hit");
                Ok(Some(token))
            }
            Err(e) => {
                warn!(key, error = %e, "ignoring undecodable cached token");
                Ok(None)
            }
        }
    }

    async fn store(&self, key: &str, token: &AccessToken) -> Result<(), KernelError> {
        let value = serde_json::to_value(token)
            .map_err(|e| KernelError::Cache(format!("failed to serialize token: {e}")))?;
        self.cache.set(key, &value, token.lifetime_secs()).await?;
        if !self.cache.has(key).await? {
            return Err(KernelError::CacheWriteFailure {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    async fn issue_and_store(&self, key: &str) -> Result<AccessToken, KernelError> {
        let response = self.issuer.issue(&self.credentials).await?;
        let failure = || KernelError::TokenIssuanceFailure {
            status: Some(response.status),
            body: response.body.clone(),
        };
        if !response.is_success() {
            return Err(failure());
        }

        let json: Value = serde_json::from_str(&response.body).map_err(|_| failure())?;
        let value = json
            .get(&self.settings.token_key)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .ok_or_else(failure)?;
        let lifetime_secs = json
            .get("expires_in")
            .and_then(parse_lifetime)
            .unwrap_or(self.settings.default_lifetime_secs);

        let token = AccessToken::new(value, Utc::now(), lifetime_secs);
        self.store(key, &token).await?;

        let fingerprint = self.fingerprint();
        info!(
            fingerprint = %fingerprint,
            lifetime_secs,
            token_len = token.value().len(),
            "access token refreshed"
        );
        self.events.publish(KernelEvent::TokenRefreshed {
            fingerprint,
            token: token.clone(),
        });
        Ok(token)
    }
}

/// `expires_in` may arrive as a number or a numeric string.
fn parse_lifetime(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
