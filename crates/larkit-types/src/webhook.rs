//! Inbound request metadata and the finished webhook response.

use serde::{Deserialize, Serialize};

/// Content type of markup replies (and the success marker).
pub const XML_CONTENT_TYPE: &str = "application/xml";
/// Content type of raw replies that do not name their own.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Query parameters a webhook callback may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookQuery {
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub encrypt_type: Option<String>,
    #[serde(default)]
    pub msg_signature: Option<String>,
}

impl WebhookQuery {
    /// The request-level signature, if present and non-empty.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref().filter(|s| !s.is_empty())
    }

    /// Secure mode: a signature is present and the payload is AES-encrypted.
    pub fn is_secure_mode(&self) -> bool {
        self.signature().is_some() && self.encrypt_type.as_deref() == Some("aes")
    }
}

/// Raw request as captured by the transport.
#[derive(Debug, Clone, Default)]
pub struct InboundEnvelope {
    pub method: String,
    pub query: WebhookQuery,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

impl InboundEnvelope {
    pub fn new(method: impl Into<String>, query: WebhookQuery, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: method.into(),
            query,
            body: body.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Output of symmetric encryption: IV plus ciphertext.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl std::fmt::Debug for EncryptedEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedEnvelope")
            .field("iv_len", &self.iv.len())
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

/// The finished response handed back to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl WebhookResponse {
    pub fn ok(content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: content_type.into(),
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_mode_requires_signature_and_aes() {
        let mut q = WebhookQuery {
            signature: Some("abc".into()),
            encrypt_type: Some("aes".into()),
            ..Default::default()
        };
        assert!(q.is_secure_mode());

        q.encrypt_type = Some("raw".into());
        assert!(!q.is_secure_mode());

        q.encrypt_type = Some("aes".into());
        q.signature = Some(String::new());
        assert!(!q.is_secure_mode());
    }

    #[test]
    fn test_query_deserializes_with_missing_params() {
        let q: WebhookQuery =
            serde_json::from_value(serde_json::json!({"timestamp": "1", "nonce": "n"})).unwrap();
        assert!(q.signature().is_none());
        assert_eq!(q.nonce.as_deref(), Some("n"));
    }
}
