//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check ordering, round-trip and all-or-nothing properties
//! against a real in-memory SQLite store.

use proptest::prelude::*;
use std::collections::HashMap;
use std::future::Future;

use crate::cache::SqliteCache;
use crate::config::CacheConfig;
use crate::error::CacheError;

// == Test Configuration ==
const TEST_DEFAULT_TTL: i64 = 300;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime")
        .block_on(future)
}

async fn open_store() -> SqliteCache<String> {
    SqliteCache::open(CacheConfig::default().with_default_ttl(Some(TEST_DEFAULT_TTL)))
        .await
        .expect("open store")
}

// == Strategies ==
/// Generates keys from a small alphabet so requests hit stored keys often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,64}"
}

/// Stored pairs, each with a flag deciding whether it is written already expired
fn stored_strategy() -> impl Strategy<Value = Vec<(String, String, bool)>> {
    prop::collection::vec((key_strategy(), value_strategy(), any::<bool>()), 0..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    // For any requested key sequence (duplicates allowed), mget returns one
    // slot per key in request order, each reflecting only that key's own state.
    #[test]
    fn prop_mget_preserves_order_and_length(
        stored in stored_strategy(),
        requested in prop::collection::vec(key_strategy(), 0..16),
    ) {
        block_on(async {
            let store = open_store().await;
            let mut expected: HashMap<String, Option<String>> = HashMap::new();

            for (key, value, expired) in &stored {
                let ttl = if *expired { Some(-1) } else { None };
                store.set(key, value.clone(), ttl).await.unwrap();
                expected.insert(key.clone(), (!expired).then(|| value.clone()));
            }

            let values = store.mget(&requested).await.unwrap();
            prop_assert_eq!(values.len(), requested.len());
            for (key, value) in requested.iter().zip(values) {
                let want = expected.get(key).cloned().flatten();
                prop_assert_eq!(value, want, "slot for {}", key);
            }
            Ok(())
        })?;
    }

    // Storing a pair and reading it back within its TTL returns the same value.
    #[test]
    fn prop_roundtrip_storage(key in "\\PC{1,32}", value in "\\PC{0,128}") {
        block_on(async {
            let store = open_store().await;
            store.set(&key, value.clone(), None).await.unwrap();
            prop_assert_eq!(store.get(&key).await.unwrap(), Some(value));
            Ok(())
        })?;
    }

    // A rejected value anywhere in a batch leaves none of the batch's keys behind.
    #[test]
    fn prop_rejected_batch_writes_nothing(
        pairs in prop::collection::vec((key_strategy(), value_strategy()), 1..10),
        reject_at in any::<prop::sample::Index>(),
    ) {
        block_on(async {
            let reject_at = reject_at.index(pairs.len());
            let mut pairs = pairs;
            pairs[reject_at].1 = "REJECT".to_string();

            let store: SqliteCache<String> = SqliteCache::open(
                CacheConfig::default().with_cacheable(|v: &String| v != "REJECT"),
            )
            .await
            .unwrap();

            let result = store.mset(&pairs, None).await;
            let rejected_first = pairs.iter().position(|(_, v)| v == "REJECT");
            match result {
                Err(CacheError::CacheableRejected { index, .. }) => {
                    prop_assert_eq!(Some(index), rejected_first);
                }
                other => prop_assert!(false, "expected rejection, got {:?}", other),
            }
            prop_assert_eq!(store.row_count().await.unwrap(), 0);
            Ok(())
        })?;
    }

    // The last write to a key wins, regardless of how many batches touched it.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        values in prop::collection::vec(value_strategy(), 1..6),
    ) {
        block_on(async {
            let store = open_store().await;
            for value in &values {
                store.set(&key, value.clone(), None).await.unwrap();
            }
            prop_assert_eq!(store.get(&key).await.unwrap(), values.last().cloned());
            prop_assert_eq!(store.row_count().await.unwrap(), 1);
            Ok(())
        })?;
    }
}
