//! Cryptographic ports.
//!
//! Defined here so the gateway and token manager can sign, encrypt and
//! fingerprint without coupling to a specific algorithm. The SHA-1,
//! AES-256-CBC and SHA-256 adapters live in larkit-infra.

use larkit_types::error::KernelError;

/// Deterministic request signature over (secret, timestamp, nonce).
pub trait SignatureVerifier: Send + Sync {
    /// Hex digest of the parts sorted byte-wise and concatenated.
    fn sign(&self, parts: &[&str]) -> String;

    /// Check `provided` against the signature of `{secret, timestamp, nonce}`.
    fn verify(&self, secret: &str, timestamp: &str, nonce: &str, provided: &str) -> bool {
        let expected = self.sign(&[secret, timestamp, nonce]);
        constant_time_eq(expected.as_bytes(), provided.as_bytes())
    }
}

/// Symmetric encryption of opaque payloads into transport-safe strings.
pub trait Encrypter: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, KernelError>;

    fn decrypt(&self, payload: &str) -> Result<String, KernelError>;
}

/// Abstraction over content hashing, used for credential fingerprints.
pub trait ContentHasher: Send + Sync {
    /// Compute a hex-encoded hash of the given content.
    fn compute_hash(&self, content: &str) -> String;
}

/// Constant-time byte comparison (XOR-based).
///
/// Time taken is independent of how many bytes match.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
