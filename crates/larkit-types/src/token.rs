use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime applied when the issuer omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 7200;

/// A short-lived bearer credential for outbound calls.
///
/// Never mutated in place; a refresh produces a new instance. The token
/// value is kept out of `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    #[serde(rename = "access_token")]
    value: String,
    issued_at: DateTime<Utc>,
    #[serde(rename = "expires_in")]
    lifetime_secs: u64,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, issued_at: DateTime<Utc>, lifetime_secs: u64) -> Self {
        Self {
            value: value.into(),
            issued_at,
            lifetime_secs,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn lifetime_secs(&self) -> u64 {
        self.lifetime_secs
    }

    /// `issued_at + lifetime_secs`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.lifetime_secs as i64)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &format_args!("[REDACTED; {} chars]", self.value.len()))
            .field("issued_at", &self.issued_at)
            .field("lifetime_secs", &self.lifetime_secs)
            .finish()
    }
}
