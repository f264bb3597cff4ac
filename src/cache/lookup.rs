//! Batched Lookup Module
//!
//! Order-preserving multi-key reads with gap filling for absent keys.

use sqlx::{Row, SqlitePool};

use crate::cache::entry::CacheRow;
use crate::cache::schema::Statements;
use crate::error::{Result, SerializationError};

// == Lookup Slot ==
/// Result for one requested key position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// No stored row for the key
    Missing,
    /// A stored row, not yet checked for freshness
    Row(CacheRow),
}

impl Slot {
    pub fn row(&self) -> Option<&CacheRow> {
        match self {
            Slot::Row(row) => Some(row),
            Slot::Missing => None,
        }
    }

    pub fn into_row(self) -> Option<CacheRow> {
        match self {
            Slot::Row(row) => Some(row),
            Slot::Missing => None,
        }
    }
}

/// Fetches one slot per requested key, in request order.
///
/// The keys travel as a single JSON array parameter that is expanded by
/// `json_each` and left-joined to the space, so a single round trip covers
/// any number of keys and misses still produce a slot. Duplicate keys each
/// get their own slot.
pub async fn lookup<K: AsRef<str>>(
    pool: &SqlitePool,
    statements: &Statements,
    keys: &[K],
) -> Result<Vec<Slot>> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let requested: Vec<&str> = keys.iter().map(AsRef::as_ref).collect();
    let payload = serde_json::to_string(&requested).map_err(SerializationError::from)?;

    let rows = sqlx::query(&statements.lookup)
        .bind(payload)
        .fetch_all(pool)
        .await?;

    let mut slots = vec![Slot::Missing; keys.len()];
    for row in rows {
        let slot: i64 = row.try_get("slot")?;
        let row_key: Option<String> = row.try_get("row_key")?;
        let Some(key) = row_key else {
            continue;
        };
        let Some(target) = usize::try_from(slot).ok().and_then(|i| slots.get_mut(i)) else {
            continue;
        };

        let value: Option<Vec<u8>> = row.try_get("val")?;
        *target = Slot::Row(CacheRow {
            key,
            value: value.unwrap_or_default(),
            created_at: row.try_get::<Option<i64>, _>("created_at")?.unwrap_or_default(),
            expire_at: row.try_get("expire_at")?,
        });
    }

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::connection::open_pool;

    async fn seeded() -> (SqlitePool, Statements) {
        let pool = open_pool(None, 1).await.unwrap();
        let stmts = Statements::for_table("kv").unwrap();
        stmts.ensure_schema(&pool).await.unwrap();

        for (key, val, expire_at) in [("a", "1", None), ("b", "2", Some(10_i64))] {
            sqlx::query(&stmts.upsert)
                .bind(key)
                .bind(val.as_bytes().to_vec())
                .bind(5_i64)
                .bind(expire_at)
                .execute(&pool)
                .await
                .unwrap();
        }
        (pool, stmts)
    }

    #[tokio::test]
    async fn test_empty_request_returns_empty() {
        let (pool, stmts) = seeded().await;
        let keys: [&str; 0] = [];
        assert!(lookup(&pool, &stmts, &keys).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_and_gaps_follow_request() {
        let (pool, stmts) = seeded().await;
        let slots = lookup(&pool, &stmts, &["b", "missing", "a"]).await.unwrap();

        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].row().unwrap().key, "b");
        assert_eq!(slots[0].row().unwrap().expire_at, Some(10));
        assert_eq!(slots[1], Slot::Missing);
        assert_eq!(slots[2].row().unwrap().value, b"1".to_vec());
        assert_eq!(slots[2].row().unwrap().expire_at, None);
    }

    #[tokio::test]
    async fn test_duplicates_get_own_slots() {
        let (pool, stmts) = seeded().await;
        let slots = lookup(&pool, &stmts, &["a", "x", "a", "a"]).await.unwrap();

        assert_eq!(slots.len(), 4);
        assert_eq!(slots[0], slots[2]);
        assert_eq!(slots[2], slots[3]);
        assert_eq!(slots[1], Slot::Missing);
    }

    #[tokio::test]
    async fn test_keys_needing_json_escapes() {
        let (pool, stmts) = seeded().await;
        let odd = "quote\"back\\slash\nnewline";
        sqlx::query(&stmts.upsert)
            .bind(odd)
            .bind(b"odd".to_vec())
            .bind(1_i64)
            .bind(Option::<i64>::None)
            .execute(&pool)
            .await
            .unwrap();

        let slots = lookup(&pool, &stmts, &[odd, "42"]).await.unwrap();
        assert_eq!(slots[0].row().unwrap().key, odd);
        assert_eq!(slots[1], Slot::Missing);
    }
}
