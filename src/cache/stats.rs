//! Cache Statistics Module
//!
//! Tracks read outcomes and sweeper activity.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Read slots answered with a fresh value
    pub hits: u64,
    /// Read slots answered as absent (missing or expired)
    pub misses: u64,
    /// Subset of misses caused by a stored but expired row
    pub expired_reads: u64,
    /// Completed sweep passes
    pub sweeps: u64,
    /// Rows removed by sweeps
    pub swept_rows: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Lock-free counters shared between an adapter and its sweeper.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    expired_reads: AtomicU64,
    sweeps: AtomicU64,
    swept_rows: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hits(&self, n: u64) {
        self.hits.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_misses(&self, n: u64) {
        self.misses.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_expired(&self, n: u64) {
        self.expired_reads.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_sweep(&self, removed: u64) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.swept_rows.fetch_add(removed, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired_reads: self.expired_reads.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            swept_rows: self.swept_rows.load(Ordering::Relaxed),
        }
    }
}
