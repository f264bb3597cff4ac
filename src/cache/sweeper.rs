//! Expiry Sweeper Module
//!
//! Best-effort, space-wide removal of expired rows, scheduled off the read
//! path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::schema::Statements;
use crate::cache::stats::StatsRecorder;
use crate::error::Result;

// == Sweeper ==
/// Handle that purges expired rows of one space. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Sweeper {
    pool: SqlitePool,
    statements: Arc<Statements>,
    stats: Arc<StatsRecorder>,
    /// Set while a scheduled sweep has not started yet
    queued: Arc<AtomicBool>,
}

impl Sweeper {
    pub(crate) fn new(
        pool: SqlitePool,
        statements: Arc<Statements>,
        stats: Arc<StatsRecorder>,
    ) -> Self {
        Self {
            pool,
            statements,
            stats,
            queued: Arc::new(AtomicBool::new(false)),
        }
    }

    // == Sweep ==
    /// Deletes every row whose `expire_at` is set and already passed.
    ///
    /// Idempotent; returns the number of rows removed.
    pub async fn sweep(&self) -> Result<u64> {
        let removed = sqlx::query(&self.statements.purge_expired)
            .bind(current_timestamp_ms())
            .execute(&self.pool)
            .await?
            .rows_affected();

        self.stats.record_sweep(removed);
        if removed > 0 {
            debug!(table = self.statements.table(), removed, "Expired rows swept");
        }
        Ok(removed)
    }

    // == Schedule ==
    /// Queues a detached sweep on the current tokio runtime and returns at once.
    ///
    /// At most one sweep is queued at a time; further calls are dropped until
    /// it starts. Without a runtime the call is a no-op. Failures are logged
    /// and discarded.
    pub fn schedule(&self) {
        if self.queued.swap(true, Ordering::AcqRel) {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            self.queued.store(false, Ordering::Release);
            return;
        };

        let sweeper = self.clone();
        handle.spawn(async move {
            // Let the triggering read hand its result back first
            tokio::task::yield_now().await;
            sweeper.queued.store(false, Ordering::Release);

            if let Err(e) = sweeper.sweep().await {
                warn!(table = sweeper.statements.table(), error = %e, "Sweep failed, ignoring");
            }
        });
    }

    /// Whether a scheduled sweep is waiting to start.
    pub fn is_queued(&self) -> bool {
        self.queued.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::connection::open_pool;
    use std::time::Duration;

    async fn setup() -> Sweeper {
        let pool = open_pool(None, 1).await.unwrap();
        let stmts = Statements::for_table("kv").unwrap();
        stmts.ensure_schema(&pool).await.unwrap();

        let now = current_timestamp_ms();
        for (key, expire_at) in [
            ("dead", Some(now - 1_000)),
            ("alive", Some(now + 60_000)),
            ("forever", None),
        ] {
            sqlx::query(&stmts.upsert)
                .bind(key)
                .bind(b"v".to_vec())
                .bind(now)
                .bind(expire_at)
                .execute(&pool)
                .await
                .unwrap();
        }
        Sweeper::new(pool, Arc::new(stmts), Arc::new(StatsRecorder::new()))
    }

    async fn remaining(sweeper: &Sweeper) -> i64 {
        let (n,): (i64,) = sqlx::query_as(&sweeper.statements.count)
            .fetch_one(&sweeper.pool)
            .await
            .unwrap();
        n
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let sweeper = setup().await;

        assert_eq!(sweeper.sweep().await.unwrap(), 1);
        assert_eq!(remaining(&sweeper).await, 2);

        // Idempotent
        assert_eq!(sweeper.sweep().await.unwrap(), 0);
        let stats = sweeper.stats.snapshot();
        assert_eq!(stats.sweeps, 2);
        assert_eq!(stats.swept_rows, 1);
    }

    #[tokio::test]
    async fn test_schedule_runs_detached() {
        let sweeper = setup().await;

        sweeper.schedule();
        assert!(sweeper.is_queued());
        // Coalesced into the queued sweep
        sweeper.schedule();

        for _ in 0..50 {
            if remaining(&sweeper).await == 2 && !sweeper.is_queued() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(remaining(&sweeper).await, 2);
        assert_eq!(sweeper.stats.snapshot().sweeps, 1);
    }

    #[test]
    fn test_schedule_without_runtime_is_noop() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let sweeper = rt.block_on(setup());

        sweeper.schedule();
        assert!(!sweeper.is_queued());
        rt.block_on(async move { sweeper.pool.close().await });
    }
}
