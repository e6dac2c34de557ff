//! Configuration types for the Larkit kernel.
//!
//! `KernelConfig` represents the top-level `larkit.toml`. It is built once at
//! startup and passed explicitly to every component that needs it. All
//! fields have sensible defaults.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::credential::CredentialSet;
use crate::token::DEFAULT_TOKEN_LIFETIME_SECS;

/// Top-level configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Shared secret used to sign webhook requests.
    #[serde(default)]
    pub token: Option<String>,

    /// Process-wide symmetric key for envelope encryption (32 bytes).
    #[serde(default)]
    pub encryption_key: Option<String>,

    /// Verify request signatures even when the request carries none.
    #[serde(default)]
    pub always_validate: bool,

    /// Return handler output verbatim instead of building markup replies.
    #[serde(default)]
    pub raw_response: bool,

    #[serde(default)]
    pub credentials: CredentialConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl fmt::Debug for KernelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "[REDACTED]"))
            .field("always_validate", &self.always_validate)
            .field("raw_response", &self.raw_response)
            .field("credentials", &self.credentials)
            .field("http", &self.http)
            .field("cache", &self.cache)
            .field("server", &self.server)
            .finish()
    }
}

/// How credentials are sent to the issuance endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueMethod {
    /// Credentials as query parameters.
    #[default]
    Get,
    /// Credentials as a JSON body.
    Post,
}

/// Access token issuance and caching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Upstream token-issuance endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub method: IssueMethod,

    /// Response field holding the token value.
    #[serde(default = "default_token_key")]
    pub token_key: String,

    /// Query parameter name used when attaching the token to outbound calls.
    /// Falls back to `token_key`.
    #[serde(default)]
    pub query_name: Option<String>,

    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    #[serde(default = "default_lifetime_secs")]
    pub default_lifetime_secs: u64,

    /// Serialize concurrent issuance per credential fingerprint.
    #[serde(default)]
    pub single_flight: bool,

    #[serde(default)]
    pub values: CredentialSet,
}

fn default_token_key() -> String {
    "access_token".to_string()
}

fn default_cache_prefix() -> String {
    "larkit.kernel.access_token.".to_string()
}

fn default_lifetime_secs() -> u64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            method: IssueMethod::default(),
            token_key: default_token_key(),
            query_name: None,
            cache_prefix: default_cache_prefix(),
            default_lifetime_secs: default_lifetime_secs(),
            single_flight: false,
            values: CredentialSet::default(),
        }
    }
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Base URI that relative endpoints are resolved against.
    #[serde(default)]
    pub base_uri: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            base_uri: None,
        }
    }
}

/// Backing store for the token cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackendKind,

    /// Database file for the SQLite backend.
    #[serde(default)]
    pub path: Option<String>,
}

/// Webhook listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Route the webhook is mounted on.
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_path() -> String {
    "/webhook".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
        }
    }
}
