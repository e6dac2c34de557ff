//! Shared domain types for the Larkit webhook kernel.
//!
//! This crate contains the types passed between the kernel layers:
//! credentials and access tokens, inbound envelopes and canonical messages,
//! reply payloads, kernel events, configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod credential;
pub mod error;
pub mod event;
pub mod message;
pub mod reply;
pub mod token;
pub mod webhook;
