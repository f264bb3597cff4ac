//! Storage Handle Module
//!
//! Opens the SQLite pool backing a cache with throughput-oriented pragmas.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{
    SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::Result;

/// Opens the storage handle.
///
/// # Arguments
/// * `path` - Database file, or `None` for a private in-memory database
/// * `max_connections` - Pool size for file-backed databases
pub async fn open_pool(path: Option<&Path>, max_connections: u32) -> Result<SqlitePool> {
    match path {
        // The database lives only as long as a connection holds it open, so
        // the pool is pinned to a single connection that is never recycled.
        None => {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
            let pool = SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?;
            info!("Opened in-memory cache database");
            Ok(pool)
        }
        Some(path) => {
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .auto_vacuum(SqliteAutoVacuum::Incremental);
            let pool = SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect_with(options)
                .await?;
            info!(path = %path.display(), max_connections, "Opened cache database file");
            Ok(pool)
        }
    }
}
