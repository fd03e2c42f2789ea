//! Property-Based Tests for Tiered Resolution
//!
//! **Property 1: Batch Completeness**
//! For any stored entries and any lookup keys, `get_multi` returns exactly
//! the distinct requested keys, each mapped to its stored value or "".
//!
//! **Property 2: Write-Once**
//! A second `set` of a key fails with AlreadyExists until the key is deleted,
//! and the first value is never replaced.
//!
//! **Property 3: Backfill**
//! After any read of a stored key, every faster tier holds the value.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;

use proptest::prelude::*;
use valet_core::Tier;
use valet_storage::DistributedCache;
use valet_test_utils::assertions::{assert_already_exists, assert_conflict_at, assert_validation_error};
use valet_test_utils::fixtures::{memory_resolver, TestTiers};
use valet_test_utils::generators::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime should build")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// **Property 1: Batch Completeness**
    #[test]
    fn prop_get_multi_returns_every_key(
        stored in arb_entries(12),
        extra in arb_lookup_keys(12),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let tiers = TestTiers::seeded(stored.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            let resolver = tiers.process();

            let keys: Vec<String> = stored.keys().cloned().chain(extra.iter().cloned()).collect();
            let result = resolver.get_multi(keys.as_slice()).await;

            let distinct: HashSet<&String> = keys.iter().collect();
            prop_assert_eq!(result.len(), distinct.len());
            for key in distinct {
                let expected = stored.get(key).cloned().unwrap_or_default();
                prop_assert_eq!(&result[key], &expected);
            }
            Ok(())
        })?;
    }

    /// **Property 1.1: Partial Backfill**
    ///
    /// With some keys already in the distributed cache and the rest only in
    /// the durable store, every stored key ends up cached after one batch
    /// read; keys found nowhere never do.
    #[test]
    fn prop_get_multi_backfills_only_resolved(
        stored in arb_entries(8),
        cached_mask in prop::collection::vec(any::<bool>(), 8),
        missing in arb_lookup_keys(8),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let tiers = TestTiers::new();
            let mut durable_only = 0;
            for (i, (key, value)) in stored.iter().enumerate() {
                if cached_mask[i] {
                    prop_assert!(tiers.cache.set(key, value).await.is_ok());
                } else {
                    tiers.store.insert_unchecked(key, value);
                    durable_only += 1;
                }
            }
            let resolver = tiers.process();

            let keys: Vec<String> = stored.keys().cloned().chain(missing.iter().cloned()).collect();
            let result = resolver.get_multi(keys.as_slice()).await;

            for (key, value) in &stored {
                prop_assert_eq!(&result[key], value);
                prop_assert_eq!(tiers.cache.peek(key), Some(value.clone()));
            }
            for key in missing.iter().filter(|k| !stored.contains_key(*k)) {
                prop_assert_eq!(result[key].as_str(), "");
                prop_assert_eq!(tiers.cache.peek(key), None);
                prop_assert_eq!(tiers.store.peek(key), None);
            }

            let cache_ops = tiers.cache.ops();
            let store_ops = tiers.store.ops();
            let backfills = cache_ops.set_multis.load(Ordering::Relaxed);
            prop_assert_eq!(backfills, u64::from(durable_only > 0));
            let all_cached = missing.iter().all(|k| stored.contains_key(k)) && durable_only == 0;
            if all_cached {
                prop_assert_eq!(store_ops.get_multis.load(Ordering::Relaxed), 0);
            }
            Ok(())
        })?;
    }

    /// **Property 2: Write-Once**
    #[test]
    fn prop_set_is_write_once(
        key in arb_key(),
        first in arb_value(),
        second in arb_value(),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let resolver = memory_resolver();

            prop_assert!(resolver.set(&key, &first).await.is_ok());
            let again = resolver.set(&key, &second).await;
            assert_already_exists(&again);
            prop_assert_eq!(resolver.get(&key).await, first.clone());

            // Reading warmed the local tier, so the next conflict is caught there.
            assert_conflict_at(&resolver.set(&key, &second).await, Tier::Local);

            prop_assert!(resolver.delete(&key).await.is_ok());
            prop_assert!(resolver.set(&key, &second).await.is_ok());
            prop_assert_eq!(resolver.get(&key).await, second);
            Ok(())
        })?;
    }

    /// **Property 2.1: Invalid keys are rejected before any tier is touched**
    #[test]
    fn prop_invalid_key_rejected(key in arb_invalid_key(), value in arb_value()) {
        let rt = runtime();
        rt.block_on(async {
            let tiers = TestTiers::new();
            let resolver = tiers.process();

            assert_validation_error(&resolver.set(&key, &value).await);
            prop_assert!(tiers.store.is_empty());
            Ok(())
        })?;
    }

    /// **Property 3: Backfill**
    #[test]
    fn prop_get_backfills_faster_tiers(entry in arb_entry()) {
        let rt = runtime();
        rt.block_on(async {
            let tiers = TestTiers::seeded([(entry.key.as_str(), entry.value.as_str())]);
            let resolver = tiers.process();

            prop_assert_eq!(resolver.get(&entry.key).await, entry.value.clone());
            prop_assert_eq!(tiers.cache.peek(&entry.key), Some(entry.value.clone()));

            // A second process is answered by the distributed cache alone.
            tiers.store.set_unavailable(true);
            let other = tiers.process();
            prop_assert_eq!(other.get(&entry.key).await, entry.value.clone());
            Ok(())
        })?;
    }

    /// **Property 3.1: Fastest tier wins**
    #[test]
    fn prop_fastest_tier_wins(key in arb_key()) {
        let rt = runtime();
        rt.block_on(async {
            let tiers = TestTiers::seeded([(key.as_str(), "durable")]);
            tiers.cache.set(&key, "distributed").await.expect("cache set");

            let resolver = tiers.process();
            prop_assert_eq!(resolver.get(&key).await, "distributed");

            tiers.cache.evict(&key);
            // The local tier was warmed with the distributed value.
            prop_assert_eq!(resolver.get(&key).await, "distributed");
            prop_assert_eq!(tiers.process().get(&key).await, "durable");
            Ok(())
        })?;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_set_commits_exactly_once() {
    let tiers = TestTiers::new();
    let writers = 16;

    let mut handles = Vec::with_capacity(writers);
    for i in 0..writers {
        // Each writer is its own process with its own local cache.
        let resolver = tiers.process();
        handles.push(tokio::spawn(async move {
            let value = format!("writer-{}", i);
            (value.clone(), resolver.set("race", &value).await)
        }));
    }

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        let (value, result) = handle.await.expect("task should not panic");
        match result {
            Ok(()) => winners.push(value),
            Err(e) => {
                assert!(e.is_already_exists(), "unexpected error: {:?}", e);
                conflicts += 1;
            }
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, writers - 1);
    assert_eq!(tiers.store.peek("race"), Some(winners[0].clone()));
    assert_eq!(tiers.process().get("race").await, winners[0]);
}

#[tokio::test]
async fn unset_key_populates_no_tier() {
    let tiers = TestTiers::new();
    let resolver = tiers.process();

    assert_eq!(resolver.get("nothing").await, "");
    let batch: HashMap<String, String> = resolver.get_multi(&["nothing", "else"]).await;
    assert!(batch.values().all(String::is_empty));

    assert!(resolver.local().is_empty());
    assert!(tiers.cache.is_empty());
    assert!(tiers.store.is_empty());
}

#[tokio::test]
async fn delete_is_idempotent_across_processes() {
    let tiers = TestTiers::new();
    let first = tiers.process();
    let second = tiers.process();

    first.set("k", "v").await.expect("set");
    first.delete("k").await.expect("first delete");
    second.delete("k").await.expect("second delete");
    second.delete("k").await.expect("repeat delete");
    assert_eq!(tiers.store.peek("k"), None);
}
