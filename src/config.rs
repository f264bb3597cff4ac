//! Configuration Module
//!
//! Handles building the cache configuration, either programmatically or from
//! environment variables.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::serializer::{Serializer, SerializerChoice};

/// Default name of the key-value space (table).
pub const DEFAULT_TABLE: &str = "kv";

/// Default TTL in seconds applied to writes without an explicit TTL.
pub const DEFAULT_TTL_SECS: i64 = 86_400;

/// Default pool size for file-backed stores.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Predicate deciding whether a value may be cached at all.
pub type CacheablePredicate<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// Callback invoked once the schema for the space exists.
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Cache configuration parameters.
pub struct CacheConfig<V> {
    /// Name of the key-value space (the backing table)
    pub table: String,
    /// Database file; `None` keeps everything in memory for the life of the cache
    pub path: Option<PathBuf>,
    /// Default TTL in seconds; `None` means default writes never expire
    pub default_ttl: Option<i64>,
    /// Value encoding
    pub serializer: SerializerChoice<V>,
    /// Optional gate applied to every value of a write batch
    pub cacheable: Option<CacheablePredicate<V>>,
    /// Optional callback fired after schema creation
    pub on_ready: Option<ReadyCallback>,
    /// Pool size for file-backed stores (in-memory stores always use one connection)
    pub max_connections: u32,
}

impl<V> CacheConfig<V> {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `KV_CACHE_TABLE` - Space name (default: kv)
    /// - `KV_CACHE_PATH` - Database file path (default: in-memory)
    /// - `KV_CACHE_DEFAULT_TTL` - Default TTL in seconds, or `none` (default: 86400)
    /// - `KV_CACHE_SERIALIZER` - `json` or `binary` (default: json)
    /// - `KV_CACHE_MAX_CONNECTIONS` - File-backed pool size (default: 4)
    pub fn from_env() -> Self {
        let default_ttl = match env::var("KV_CACHE_DEFAULT_TTL") {
            Ok(v) if v.trim().eq_ignore_ascii_case("none") => None,
            Ok(v) => Some(v.trim().parse().unwrap_or(DEFAULT_TTL_SECS)),
            Err(_) => Some(DEFAULT_TTL_SECS),
        };

        Self {
            table: env::var("KV_CACHE_TABLE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            path: env::var("KV_CACHE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            default_ttl,
            serializer: env::var("KV_CACHE_SERIALIZER")
                .ok()
                .and_then(|v| SerializerChoice::from_name(&v))
                .unwrap_or_default(),
            cacheable: None,
            on_ready: None,
            max_connections: env::var("KV_CACHE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_default_ttl(mut self, ttl_secs: Option<i64>) -> Self {
        self.default_ttl = ttl_secs;
        self
    }

    pub fn with_serializer(mut self, serializer: SerializerChoice<V>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Shorthand for `with_serializer(SerializerChoice::Custom(..))`.
    pub fn with_custom_serializer(mut self, serializer: Arc<dyn Serializer<V>>) -> Self {
        self.serializer = SerializerChoice::Custom(serializer);
        self
    }

    pub fn with_cacheable<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.cacheable = Some(Arc::new(predicate));
        self
    }

    pub fn with_on_ready<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_ready = Some(Box::new(callback));
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }
}

impl<V> Default for CacheConfig<V> {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            path: None,
            default_ttl: Some(DEFAULT_TTL_SECS),
            serializer: SerializerChoice::Json,
            cacheable: None,
            on_ready: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl<V> fmt::Debug for CacheConfig<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("table", &self.table)
            .field("path", &self.path)
            .field("default_ttl", &self.default_ttl)
            .field("serializer", &self.serializer)
            .field("cacheable", &self.cacheable.is_some())
            .field("on_ready", &self.on_ready.is_some())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}
