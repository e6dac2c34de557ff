//! Protocol logic and port (trait) definitions for the Larkit kernel.
//!
//! This crate defines the traits the infrastructure layer implements
//! (signature hashing, envelope encryption, TTL caching, token issuance)
//! and the logic built on them: the webhook gateway, the handler registry,
//! the message codec, and the access token manager. It depends only on
//! `larkit-types` -- never on `larkit-infra` or any crypto/IO crate.

pub mod crypto;
pub mod event;
pub mod gateway;
pub mod message;
pub mod storage;
pub mod token;
