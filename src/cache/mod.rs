//! Cache Module
//!
//! Durable key-value caching with TTL expiration on top of SQLite.

mod connection;
mod entry;
mod lookup;
mod schema;
mod stats;
mod store;
mod sweeper;
mod write;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheRow, Expiry, KeyTtl, Ttl};
pub use lookup::Slot;
pub use stats::CacheStats;
pub use store::SqliteCache;
pub use sweeper::Sweeper;
