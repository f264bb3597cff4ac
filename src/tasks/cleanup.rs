//! Periodic Sweep Task
//!
//! Optional background task that sweeps expired rows on a fixed interval,
//! in addition to the sweeps scheduled by reads.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::Sweeper;

/// Spawns a background task that periodically sweeps expired rows.
///
/// The task runs until aborted. Sweep failures are logged and the loop
/// continues.
///
/// # Arguments
/// * `sweeper` - Handle obtained from [`crate::SqliteCache::sweeper`]
/// * `interval_secs` - Interval in seconds between sweeps
///
/// # Example
/// ```ignore
/// let cache: SqliteCache<String> = SqliteCache::open(CacheConfig::default()).await?;
/// let handle = spawn_sweep_task(cache.sweeper(), 60);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task(sweeper: Sweeper, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!("Starting sweep task with interval of {} seconds", interval_secs);

        loop {
            tokio::time::sleep(interval).await;

            match sweeper.sweep().await {
                Ok(0) => debug!("Periodic sweep: no expired rows found"),
                Ok(removed) => info!("Periodic sweep: removed {} expired rows", removed),
                Err(e) => warn!("Periodic sweep failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheConfig, SqliteCache};

    #[tokio::test]
    async fn test_sweep_task_removes_expired_rows() {
        let cache: SqliteCache<String> = SqliteCache::open(CacheConfig::default()).await.unwrap();
        cache.set("expire_soon", "value".to_string(), Some(0)).await.unwrap();
        cache.set("long_lived", "value".to_string(), Some(3600)).await.unwrap();

        let handle = spawn_sweep_task(cache.sweeper(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.row_count().await.unwrap(), 1);
        assert_eq!(cache.keys(None).await.unwrap(), vec!["long_lived".to_string()]);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let cache: SqliteCache<String> = SqliteCache::open(CacheConfig::default()).await.unwrap();
        let handle = spawn_sweep_task(cache.sweeper(), 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
