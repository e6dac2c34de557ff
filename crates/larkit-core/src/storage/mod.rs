//! Storage ports.

pub mod cache_store;

pub use cache_store::TtlCache;
