//! HTTP layer: the webhook endpoint and a health probe.

pub mod error;
pub mod handlers;
pub mod router;
