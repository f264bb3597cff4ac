//! Batched Write Module
//!
//! All-or-nothing multi-key upserts with a single TTL per batch.

use sqlx::SqlitePool;
use tracing::debug;

use crate::cache::entry::{current_timestamp_ms, Expiry};
use crate::cache::schema::Statements;
use crate::config::CacheablePredicate;
use crate::error::{CacheError, Result};
use crate::serializer::Serializer;

/// A fully encoded row waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRow {
    pub key: String,
    pub value: Vec<u8>,
}

/// A batch whose values all passed the cacheability gate and were encoded.
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    pub rows: Vec<PendingRow>,
    pub created_at: i64,
    pub expire_at: Option<i64>,
}

/// Encodes every pair of a batch, stamping one `created_at`/`expire_at` for all.
///
/// Nothing is written here: a value rejected by `cacheable` or failing to
/// serialize aborts the whole batch before the storage engine is touched.
pub fn prepare_batch<K, V>(
    pairs: &[(K, V)],
    expiry: Expiry,
    default_ttl: Option<i64>,
    serializer: &dyn Serializer<V>,
    cacheable: Option<&CacheablePredicate<V>>,
) -> Result<PreparedBatch>
where
    K: AsRef<str>,
{
    let created_at = current_timestamp_ms();
    let expire_at = expiry.resolve(created_at, default_ttl);

    let mut rows = Vec::with_capacity(pairs.len());
    for (index, (key, value)) in pairs.iter().enumerate() {
        if let Some(predicate) = cacheable {
            if !(**predicate)(value) {
                return Err(CacheError::CacheableRejected {
                    key: key.as_ref().to_string(),
                    index,
                });
            }
        }
        rows.push(PendingRow {
            key: key.as_ref().to_string(),
            value: serializer.serialize(value)?,
        });
    }

    Ok(PreparedBatch {
        rows,
        created_at,
        expire_at,
    })
}

/// Upserts a prepared batch inside one transaction.
///
/// Any statement failure drops the transaction, which rolls back every row
/// of the batch.
pub async fn write_all(
    pool: &SqlitePool,
    statements: &Statements,
    batch: PreparedBatch,
) -> Result<()> {
    if batch.rows.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for row in &batch.rows {
        sqlx::query(&statements.upsert)
            .bind(&row.key)
            .bind(&row.value)
            .bind(batch.created_at)
            .bind(batch.expire_at)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    debug!(
        table = statements.table(),
        rows = batch.rows.len(),
        expire_at = ?batch.expire_at,
        "Batch written"
    );
    Ok(())
}
