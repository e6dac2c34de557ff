//! SQLite storage layer.
//!
//! A persistent TTL cache backed by SQLite with WAL mode and split
//! read/write connection pools, so issued tokens survive restarts.

pub mod cache;
pub mod pool;

pub use cache::SqliteTtlCache;
pub use pool::DatabasePool;
