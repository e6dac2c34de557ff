//! Infrastructure layer for Larkit.
//!
//! Contains implementations of the port traits defined in `larkit-core`:
//! SHA-1 request signatures, the AES-256-CBC envelope cipher, SHA-256
//! credential fingerprints, in-memory and SQLite TTL caches, the reqwest
//! token issuer, and the TOML configuration loader.

pub mod cache;
pub mod config;
pub mod crypto;
pub mod http;
pub mod sqlite;
