//! SQLite KV Cache - A durable TTL key-value cache
//!
//! Provides process-local (or file-shared) caching with crash resilience on
//! top of embedded SQLite, without a separate cache server.
//!
//! ```ignore
//! let cache: SqliteCache<String> = SqliteCache::open(CacheConfig::default()).await?;
//! cache.mset(&[("a", "1".to_string()), ("b", "2".to_string())], None).await?;
//! let values = cache.mget(&["a", "missing", "b"]).await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod serializer;
pub mod tasks;

pub use cache::{CacheStats, Expiry, KeyTtl, SqliteCache, Sweeper, Ttl};
pub use config::CacheConfig;
pub use error::{CacheError, Result, SerializationError};
pub use serializer::{BinarySerializer, JsonSerializer, Serializer, SerializerChoice};
pub use tasks::spawn_sweep_task;
