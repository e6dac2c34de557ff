//! SHA-1 request signatures.
//!
//! The parts are sorted byte-wise (not numerically), concatenated without a
//! separator, hashed with SHA-1 and hex-encoded in lowercase.

use sha1::{Digest, Sha1};

use larkit_core::crypto::SignatureVerifier;

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1SignatureVerifier;

impl Sha1SignatureVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl SignatureVerifier for Sha1SignatureVerifier {
    fn sign(&self, parts: &[&str]) -> String {
        let mut sorted = parts.to_vec();
        sorted.sort_unstable();

        let mut sha = Sha1::new();
        for part in sorted {
            sha.update(part.as_bytes());
        }
        hex::encode(sha.finalize())
    }
}
