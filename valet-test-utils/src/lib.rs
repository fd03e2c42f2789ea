//! VALET Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for keys, values, and entries
//! - Fixtures wiring the in-memory backends into a resolver
//! - Custom assertions for `ValetResult`

pub use valet_core::{
    Entry, StoreError, Tier, ValetConfig, ValetError, ValetResult, ValidationError, MAX_KEY_BYTES,
};
pub use valet_storage::{
    MemoryDistributedCache, MemoryDurableStore, MemoryLocalCache, ValueResolver,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for keys, values, and entries.

    use super::*;
    use proptest::collection::{btree_map, vec};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    /// Generate a valid key: short, non-blank, printable.
    pub fn arb_key() -> impl Strategy<Value = String> {
        "[a-zA-Z][a-zA-Z0-9_.-]{0,31}"
    }

    /// Generate a stored value. Empty values are legal.
    pub fn arb_value() -> impl Strategy<Value = String> {
        prop_oneof![
            1 => Just(String::new()),
            8 => "[ -~]{1,64}",
            1 => "\\PC{1,16}",
        ]
    }

    /// Generate a non-empty value, for tests that need to tell "set" from "unset".
    pub fn arb_nonempty_value() -> impl Strategy<Value = String> {
        "[ -~]{1,64}"
    }

    /// Generate an entry with a valid key.
    pub fn arb_entry() -> impl Strategy<Value = Entry> {
        (arb_key(), arb_value()).prop_map(|(key, value)| Entry::new(key, value))
    }

    /// Generate a set of distinct entries, keyed and ordered by key.
    pub fn arb_entries(max: usize) -> impl Strategy<Value = BTreeMap<String, String>> {
        btree_map(arb_key(), arb_nonempty_value(), 0..=max)
    }

    /// Generate a list of lookup keys, possibly with duplicates.
    pub fn arb_lookup_keys(max: usize) -> impl Strategy<Value = Vec<String>> {
        vec(arb_key(), 0..=max)
    }

    /// Generate a key that `set` must reject.
    pub fn arb_invalid_key() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            " {1,8}",
            "[a-z]{1,8}".prop_map(|s| s.repeat(MAX_KEY_BYTES + 1)),
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built backends and resolvers.

    use super::*;
    use std::sync::Arc;

    /// Resolver over the in-memory backends.
    pub type MemoryResolver =
        ValueResolver<MemoryLocalCache, MemoryDistributedCache, MemoryDurableStore>;

    /// The shared tiers of a deployment: one distributed cache and one
    /// durable store. Each [`TestTiers::process`] call models a separate
    /// process with its own local cache.
    #[derive(Debug, Clone, Default)]
    pub struct TestTiers {
        pub cache: Arc<MemoryDistributedCache>,
        pub store: Arc<MemoryDurableStore>,
    }

    impl TestTiers {
        pub fn new() -> Self {
            Self::default()
        }

        /// Tiers whose durable store already holds `entries`.
        pub fn seeded<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
            let tiers = Self::new();
            for (key, value) in entries {
                tiers.store.insert_unchecked(key, value);
            }
            tiers
        }

        /// A resolver with a fresh local cache over the shared tiers.
        pub fn process(&self) -> MemoryResolver {
            ValueResolver::new(
                Arc::new(MemoryLocalCache::new()),
                Arc::clone(&self.cache),
                Arc::clone(&self.store),
            )
        }
    }

    /// A resolver over fresh, empty in-memory tiers.
    pub fn memory_resolver() -> MemoryResolver {
        TestTiers::new().process()
    }

    /// Config pointing both LMDB environments under `root`.
    pub fn lmdb_config(root: &std::path::Path) -> ValetConfig {
        ValetConfig::default()
            .with_durable_path(root.join("durable"))
            .with_cache_path(root.join("cache"))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on `ValetResult` values.

    use super::*;

    /// Assert that a ValetResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &ValetResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a ValetResult is an AlreadyExists conflict.
    #[track_caller]
    pub fn assert_already_exists<T: std::fmt::Debug>(result: &ValetResult<T>) {
        match result {
            Err(ValetError::Storage(StoreError::AlreadyExists { .. })) => {}
            other => panic!("Expected AlreadyExists, got: {:?}", other),
        }
    }

    /// Assert that a ValetResult is an AlreadyExists conflict found at `tier`.
    #[track_caller]
    pub fn assert_conflict_at<T: std::fmt::Debug>(result: &ValetResult<T>, tier: Tier) {
        match result {
            Err(ValetError::Storage(StoreError::AlreadyExists { tier: found, .. })) => {
                assert_eq!(*found, tier, "Conflict reported at the wrong tier");
            }
            other => panic!("Expected AlreadyExists at {}, got: {:?}", tier, other),
        }
    }

    /// Assert that a ValetResult is a validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &ValetResult<T>) {
        match result {
            Err(ValetError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a ValetResult reports an unavailable backend.
    #[track_caller]
    pub fn assert_unavailable<T: std::fmt::Debug>(result: &ValetResult<T>) {
        match result {
            Err(ValetError::Storage(StoreError::BackendUnavailable { .. })) => {}
            other => panic!("Expected BackendUnavailable, got: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_generated_keys_are_valid(key in arb_key()) {
            prop_assert!(valet_core::validate_key(&key).is_ok());
        }

        #[test]
        fn prop_invalid_keys_are_rejected(key in arb_invalid_key()) {
            prop_assert!(valet_core::validate_key(&key).is_err());
        }
    }
}
