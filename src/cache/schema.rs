//! Row Schema Module
//!
//! Fixed relational layout of a key-value space and the parametrized
//! statements every cache operation runs against it.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{CacheError, Result};

// == Statement Set ==
/// SQL text for one named space.
///
/// The space name cannot be bound as a parameter, so it is validated once
/// here and quoted into every statement.
#[derive(Debug, Clone)]
pub struct Statements {
    table: String,
    pub create_table: String,
    pub create_index: String,
    /// `?1` = JSON array of keys. One output row per array element, in array order.
    pub lookup: String,
    /// `?1` key, `?2` val, `?3` created_at, `?4` expire_at
    pub upsert: String,
    pub delete_one: String,
    /// `?1` = JSON array of keys
    pub delete_many: String,
    pub truncate: String,
    /// `?1` = cut-off timestamp
    pub purge_expired: String,
    pub expire_at: String,
    pub keys_all: String,
    pub keys_like: String,
    pub count: String,
}

impl Statements {
    /// Builds the statement set for `table`, rejecting names that are not
    /// plain SQL identifiers.
    pub fn for_table(table: &str) -> Result<Self> {
        validate_table_name(table)?;
        let t = format!("\"{}\"", table);

        Ok(Self {
            table: table.to_string(),
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS {t} (\
                 key TEXT PRIMARY KEY, \
                 val BLOB, \
                 created_at INTEGER, \
                 expire_at INTEGER)"
            ),
            create_index: format!(
                "CREATE INDEX IF NOT EXISTS \"{table}_expire_at\" ON {t} (expire_at)"
            ),
            // json_each acts as the virtual table of requested keys; its
            // `key` column is the array index, which fixes output order.
            lookup: format!(
                "SELECT req.key AS slot, req.value AS req_key, \
                 stored.key AS row_key, stored.val, stored.created_at, stored.expire_at \
                 FROM json_each(?1) AS req \
                 LEFT JOIN {t} AS stored ON stored.key = req.value \
                 ORDER BY req.key"
            ),
            upsert: format!(
                "INSERT INTO {t} (key, val, created_at, expire_at) VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(key) DO UPDATE SET \
                 val = excluded.val, \
                 created_at = excluded.created_at, \
                 expire_at = excluded.expire_at"
            ),
            delete_one: format!("DELETE FROM {t} WHERE key = ?1"),
            delete_many: format!(
                "DELETE FROM {t} WHERE key IN (SELECT value FROM json_each(?1))"
            ),
            truncate: format!("DELETE FROM {t}"),
            purge_expired: format!(
                "DELETE FROM {t} WHERE expire_at IS NOT NULL AND expire_at < ?1"
            ),
            expire_at: format!("SELECT expire_at FROM {t} WHERE key = ?1"),
            keys_all: format!("SELECT key FROM {t} ORDER BY rowid"),
            keys_like: format!("SELECT key FROM {t} WHERE key LIKE ?1 ORDER BY rowid"),
            count: format!("SELECT COUNT(*) FROM {t}"),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Creates the table and its expiry index if they do not exist yet.
    pub async fn ensure_schema(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query(&self.create_table).execute(pool).await?;
        sqlx::query(&self.create_index).execute(pool).await?;
        debug!(table = %self.table, "Schema ready");
        Ok(())
    }
}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`.
fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidConfig(format!(
            "Space name '{}' must match [A-Za-z_][A-Za-z0-9_]*",
            table
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(Statements::for_table("kv").is_ok());
        assert!(Statements::for_table("_sessions_v2").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "2fa", "kv; DROP TABLE x", "with space", "quo\"te", "dash-ed"] {
            let result = Statements::for_table(name);
            assert!(
                matches!(result, Err(CacheError::InvalidConfig(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_statements_target_table() {
        let stmts = Statements::for_table("sessions").unwrap();
        assert_eq!(stmts.table(), "sessions");
        assert!(stmts.create_table.contains("\"sessions\""));
        assert!(stmts.create_index.contains("\"sessions_expire_at\""));
        assert!(stmts.lookup.contains("LEFT JOIN \"sessions\""));
        assert!(stmts.purge_expired.contains("expire_at IS NOT NULL"));
    }
}
