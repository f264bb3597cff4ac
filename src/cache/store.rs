//! Cache Store Module
//!
//! Adapter surface composing the lookup, write and sweep engines into the
//! get/set/mget/mset/del/mdel/ttl/keys/reset operations.

use std::fmt;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::cache::connection::open_pool;
use crate::cache::entry::{current_timestamp_ms, is_fresh, Expiry, KeyTtl, Ttl};
use crate::cache::lookup::{lookup, Slot};
use crate::cache::schema::Statements;
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::cache::sweeper::Sweeper;
use crate::cache::write::{prepare_batch, write_all};
use crate::config::{CacheConfig, CacheablePredicate};
use crate::error::{CacheError, Result, SerializationError};
use crate::serializer::Serializer;

// == Cache Store ==
/// Durable TTL cache over one key-value space of a SQLite database.
///
/// Clones share the same storage handle, serializer and counters.
pub struct SqliteCache<V> {
    pool: SqlitePool,
    statements: Arc<Statements>,
    serializer: Arc<dyn Serializer<V>>,
    cacheable: Option<CacheablePredicate<V>>,
    default_ttl: Option<i64>,
    stats: Arc<StatsRecorder>,
    sweeper: Sweeper,
}

impl<V> SqliteCache<V>
where
    V: Serialize + DeserializeOwned + 'static,
{
    // == Constructor ==
    /// Opens the storage handle, creates the schema and resolves the
    /// configured serializer.
    pub async fn open(mut config: CacheConfig<V>) -> Result<Self> {
        let serializer = std::mem::take(&mut config.serializer).build();
        Self::open_with_serializer(config, serializer).await
    }
}

impl<V> SqliteCache<V> {
    /// Like [`SqliteCache::open`], but with an explicit serializer; the
    /// config's `serializer` field is ignored. Works for value types without
    /// serde support.
    pub async fn open_with_serializer(
        config: CacheConfig<V>,
        serializer: Arc<dyn Serializer<V>>,
    ) -> Result<Self> {
        let statements = Arc::new(Statements::for_table(&config.table)?);
        let pool = open_pool(config.path.as_deref(), config.max_connections).await?;
        statements.ensure_schema(&pool).await?;

        info!(
            table = statements.table(),
            serializer = serializer.name(),
            default_ttl = ?config.default_ttl,
            "Cache ready"
        );
        if let Some(on_ready) = config.on_ready {
            on_ready();
        }

        let stats = Arc::new(StatsRecorder::new());
        let sweeper = Sweeper::new(pool.clone(), statements.clone(), stats.clone());

        Ok(Self {
            pool,
            statements,
            serializer,
            cacheable: config.cacheable,
            default_ttl: config.default_ttl,
            stats,
            sweeper,
        })
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns `None` for missing or expired keys. Reading an expired row
    /// schedules a sweep.
    pub async fn get(&self, key: &str) -> Result<Option<V>> {
        let mut values = self.mget(&[key]).await?;
        Ok(values.pop().flatten())
    }

    // == Multi Get ==
    /// Retrieves values for `keys`, one output slot per input key in the same
    /// order. Duplicates each get their own slot.
    pub async fn mget<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<V>>> {
        let slots = lookup(&self.pool, &self.statements, keys).await?;
        let now = current_timestamp_ms();

        let mut values = Vec::with_capacity(slots.len());
        let mut expired = 0u64;
        for slot in slots {
            match slot {
                Slot::Row(row) if row.is_fresh(now) => {
                    values.push(Some(self.serializer.deserialize(&row.value)?));
                }
                Slot::Row(_) => {
                    expired += 1;
                    values.push(None);
                }
                Slot::Missing => values.push(None),
            }
        }

        let hits = values.iter().filter(|v| v.is_some()).count() as u64;
        self.stats.record_hits(hits);
        self.stats.record_misses(values.len() as u64 - hits);
        if expired > 0 {
            self.stats.record_expired(expired);
            self.sweeper.schedule();
        }
        Ok(values)
    }

    // == Has ==
    /// Returns true if the key has a fresh row. Does not decode the value.
    /// Observing an expired row schedules a sweep.
    pub async fn has(&self, key: &str) -> Result<bool> {
        let slots = lookup(&self.pool, &self.statements, &[key]).await?;
        let now = current_timestamp_ms();

        let Some(row) = slots.first().and_then(Slot::row) else {
            return Ok(false);
        };
        let fresh = row.is_fresh(now);
        if !fresh {
            self.sweeper.schedule();
        }
        Ok(fresh)
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - TTL in seconds (space default if None); zero or negative
    ///   stores an already-expired row
    pub async fn set(&self, key: &str, value: V, ttl: Option<i64>) -> Result<()> {
        self.mset(&[(key, value)], ttl).await
    }

    // == Multi Set ==
    /// Stores all pairs atomically with one TTL for the whole batch.
    /// An empty batch is a no-op.
    pub async fn mset<K: AsRef<str>>(&self, pairs: &[(K, V)], ttl: Option<i64>) -> Result<()> {
        self.mset_with_expiry(pairs, Expiry::from(ttl)).await
    }

    /// [`SqliteCache::mset`] with full control over expiry, including
    /// never-expiring rows.
    pub async fn mset_with_expiry<K: AsRef<str>>(
        &self,
        pairs: &[(K, V)],
        expiry: Expiry,
    ) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let batch = prepare_batch(
            pairs,
            expiry,
            self.default_ttl,
            self.serializer.as_ref(),
            self.cacheable.as_ref(),
        )?;
        write_all(&self.pool, &self.statements, batch).await
    }

    // == Delete ==
    /// Removes an entry by key. Deleting a missing key is not an error.
    pub async fn del(&self, key: &str) -> Result<()> {
        sqlx::query(&self.statements.delete_one)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Removes several entries in a single statement.
    pub async fn mdel<K: AsRef<str>>(&self, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let requested: Vec<&str> = keys.iter().map(AsRef::as_ref).collect();
        let payload = serde_json::to_string(&requested).map_err(SerializationError::from)?;
        sqlx::query(&self.statements.delete_many)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // == Time To Live ==
    /// Remaining lifetime of a key.
    ///
    /// Never-expiring and absent keys both report [`Ttl::Unbounded`]; see
    /// [`SqliteCache::ttl_detailed`] to tell them apart.
    pub async fn ttl(&self, key: &str) -> Result<Ttl> {
        Ok(self.ttl_detailed(key).await?.into())
    }

    /// Remaining lifetime of a key, distinguishing absent from never-expiring.
    /// An expired row counts as absent and schedules a sweep.
    pub async fn ttl_detailed(&self, key: &str) -> Result<KeyTtl> {
        let row = sqlx::query(&self.statements.expire_at)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(KeyTtl::Absent);
        };
        let expire_at: Option<i64> = row.try_get("expire_at")?;
        let now = current_timestamp_ms();

        Ok(match expire_at {
            None => KeyTtl::NeverExpires,
            Some(at) if is_fresh(Some(at), now) => KeyTtl::ExpiresIn((at - now) as u64),
            Some(_) => {
                self.sweeper.schedule();
                KeyTtl::Absent
            }
        })
    }

    // == Keys ==
    /// Lists stored keys in creation order, optionally filtered by a SQL
    /// `LIKE` pattern (`%` any run, `_` one character; ASCII
    /// case-insensitive). Expired rows not yet swept are included.
    pub async fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let rows = match pattern {
            Some(pattern) => {
                sqlx::query(&self.statements.keys_like)
                    .bind(pattern)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query(&self.statements.keys_all)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter()
            .map(|row| row.try_get::<String, _>("key").map_err(CacheError::from))
            .collect()
    }

    // == Reset ==
    /// Removes every row of the space.
    pub async fn reset(&self) -> Result<()> {
        let removed = sqlx::query(&self.statements.truncate)
            .execute(&self.pool)
            .await?
            .rows_affected();
        info!(table = self.statements.table(), removed, "Cache reset");
        Ok(())
    }

    // == Housekeeping ==
    /// Runs a sweep now and waits for it. Returns the number of rows removed.
    pub async fn sweep(&self) -> Result<u64> {
        self.sweeper.sweep().await
    }

    /// Handle for scheduling sweeps, e.g. with [`crate::tasks::spawn_sweep_task`].
    pub fn sweeper(&self) -> Sweeper {
        self.sweeper.clone()
    }

    /// Physical row count, including expired rows not yet swept.
    pub async fn row_count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(&self.statements.count)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Name of the key-value space.
    pub fn table(&self) -> &str {
        self.statements.table()
    }

    /// Closes the storage handle. Operations on any clone fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
        info!(table = self.statements.table(), "Cache closed");
    }
}

impl<V> Clone for SqliteCache<V> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            statements: self.statements.clone(),
            serializer: self.serializer.clone(),
            cacheable: self.cacheable.clone(),
            default_ttl: self.default_ttl,
            stats: self.stats.clone(),
            sweeper: self.sweeper.clone(),
        }
    }
}

impl<V> fmt::Debug for SqliteCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteCache")
            .field("table", &self.statements.table())
            .field("serializer", &self.serializer.name())
            .field("default_ttl", &self.default_ttl)
            .field("cacheable", &self.cacheable.is_some())
            .finish()
    }
}
