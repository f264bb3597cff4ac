//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Serialization Error ==
/// Failure to encode or decode a cached value.
#[derive(Error, Debug)]
pub enum SerializationError {
    /// The plain-text JSON encoding failed
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The compact binary encoding failed
    #[error("binary: {0}")]
    Binary(#[from] bincode::Error),

    /// A user-supplied serializer reported a failure
    #[error("{0}")]
    Custom(String),
}

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A value could not be encoded or decoded
    #[error("Serialization failed: {0}")]
    Serialization(#[from] SerializationError),

    /// A value failed the configured cacheability predicate; the whole batch was dropped
    #[error("Value for key '{key}' (batch position {index}) is not cacheable")]
    CacheableRejected { key: String, index: usize },

    /// The storage engine failed to execute a statement
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
