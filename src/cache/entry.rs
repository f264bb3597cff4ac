//! Cache Row Module
//!
//! Defines the stored row shape, the expiry policy applied at write time and
//! the remaining-TTL answers returned by reads.

use chrono::Utc;

// == Cache Row ==
/// One stored row of a key-value space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRow {
    /// Primary identity of the row
    pub key: String,
    /// Serialized value bytes
    pub value: Vec<u8>,
    /// Write timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Expiration timestamp (Unix milliseconds), None = never expires
    pub expire_at: Option<i64>,
}

impl CacheRow {
    /// A row is fresh when it never expires or its expiry is still ahead of `now`.
    ///
    /// Boundary condition: `expire_at == now` is already dead.
    pub fn is_fresh(&self, now: i64) -> bool {
        is_fresh(self.expire_at, now)
    }

    /// Remaining lifetime in milliseconds, `None` for never-expiring rows.
    /// Saturates at zero once expired.
    pub fn remaining_ms(&self, now: i64) -> Option<u64> {
        self.expire_at.map(|at| at.saturating_sub(now).max(0) as u64)
    }
}

/// Freshness predicate shared by every read path.
pub fn is_fresh(expire_at: Option<i64>, now: i64) -> bool {
    match expire_at {
        Some(at) => at > now,
        None => true,
    }
}

// == Expiry ==
/// How a write batch computes its `expire_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry {
    /// Use the space's configured default TTL
    #[default]
    Default,
    /// Expire this many seconds after the write; zero or negative yields an already-dead row
    After(i64),
    /// Never expire (`expire_at` is NULL)
    Never,
}

impl Expiry {
    /// Resolves to an absolute `expire_at` for a batch written at `now`.
    pub fn resolve(self, now: i64, default_ttl: Option<i64>) -> Option<i64> {
        let ttl_secs = match self {
            Expiry::Default => default_ttl,
            Expiry::After(secs) => Some(secs),
            Expiry::Never => None,
        };
        ttl_secs.map(|secs| now.saturating_add(secs.saturating_mul(1000)))
    }
}

impl From<Option<i64>> for Expiry {
    fn from(ttl: Option<i64>) -> Self {
        match ttl {
            Some(secs) => Expiry::After(secs),
            None => Expiry::Default,
        }
    }
}

// == Time To Live ==
/// Remaining lifetime as reported by `ttl()`.
///
/// `Unbounded` covers both never-expiring keys and keys that are not
/// present; use [`KeyTtl`] to tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Millis(u64),
    Unbounded,
}

impl Ttl {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Ttl::Unbounded)
    }

    /// Remaining milliseconds as a float, `f64::INFINITY` when unbounded.
    pub fn as_millis_f64(&self) -> f64 {
        match self {
            Ttl::Millis(ms) => *ms as f64,
            Ttl::Unbounded => f64::INFINITY,
        }
    }
}

/// Distinguishing form of the remaining lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// No live row for the key (missing or already expired)
    Absent,
    /// Row exists and never expires
    NeverExpires,
    /// Row expires in this many milliseconds
    ExpiresIn(u64),
}

impl From<KeyTtl> for Ttl {
    fn from(ttl: KeyTtl) -> Self {
        match ttl {
            KeyTtl::ExpiresIn(ms) => Ttl::Millis(ms),
            KeyTtl::Absent | KeyTtl::NeverExpires => Ttl::Unbounded,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
