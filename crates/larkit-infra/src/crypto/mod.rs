//! Cryptographic adapters.
//!
//! - `signature`: SHA-1 over sorted, concatenated parts
//! - `envelope`: AES-256-CBC with a random IV, base64-of-JSON wire form
//! - `hash`: SHA-256 credential fingerprints

pub mod envelope;
pub mod hash;
pub mod signature;

pub use envelope::AesCbcEncrypter;
pub use hash::Sha256ContentHasher;
pub use signature::Sha1SignatureVerifier;
