//! Tiered value resolution and write-once admission.
//!
//! The resolver answers reads by walking the tiers fastest first and
//! backfilling every tier that missed once a slower tier answers. Reads never
//! fail: a backend error is logged and treated as a miss, and an unresolvable
//! key reads as the empty string.
//!
//! Keys that could never be stored (blank or oversized) read as the empty
//! string without reaching any backend.
//!
//! Writes are administrative. A key can be set once; it must be deleted
//! before it can be set again. The durable store's per-key transaction is the
//! authority on whether a key exists; the cache checks in front of it only
//! save a wasted transaction. Every tier a write consults must answer: an
//! unreachable distributed cache fails the write.
//!
//! # Staleness
//!
//! Local caches are never expired. `delete` evicts the deleting process's own
//! local cache, but every other process keeps serving the deleted value from
//! memory until it restarts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use valet_core::{validate_key, Entry, Removal, StoreError, Tier, ValetResult};

use crate::cache::{CacheLookup, DistributedCache, LocalCache};
use crate::durable::DurableStore;

/// Resolves values across the local, distributed, and durable tiers.
///
/// # Type Parameters
///
/// - `L`: the process-local cache
/// - `C`: the distributed cache
/// - `S`: the durable store
///
/// # Example
///
/// ```ignore
/// let resolver = ValueResolver::new(
///     Arc::new(MemoryLocalCache::new()),
///     Arc::new(LmdbDistributedCache::from_config(&config)?),
///     Arc::new(LmdbDurableStore::from_config(&config)?),
/// );
///
/// resolver.set("oauth_client_secret", "s3cr3t").await?;
/// let secret = resolver.get("oauth_client_secret").await;
/// ```
pub struct ValueResolver<L, C, S>
where
    L: LocalCache,
    C: DistributedCache,
    S: DurableStore,
{
    local: Arc<L>,
    cache: Arc<C>,
    store: Arc<S>,
}

impl<L, C, S> ValueResolver<L, C, S>
where
    L: LocalCache,
    C: DistributedCache,
    S: DurableStore,
{
    /// Create a resolver over the given tiers.
    pub fn new(local: Arc<L>, cache: Arc<C>, store: Arc<S>) -> Self {
        Self {
            local,
            cache,
            store,
        }
    }

    /// Get a reference to the process-local cache.
    pub fn local(&self) -> &L {
        &self.local
    }

    /// Get a reference to the distributed cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Get a reference to the durable store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the value for `key`, or the empty string if no tier resolves it.
    ///
    /// A hit at a slower tier fills every faster tier that missed.
    pub async fn get(&self, key: &str) -> String {
        if validate_key(key).is_err() {
            debug!(key = %key, "Unstorable key reads as empty");
            return String::new();
        }

        if let Some(value) = self.local.get(key) {
            return value;
        }

        match self.cache.get(key).await {
            CacheLookup::Hit(value) => {
                self.local.put(key, &value);
                return value;
            }
            CacheLookup::Miss => {}
            CacheLookup::Unavailable(e) => {
                warn!(key = %key, error = %e, "Distributed cache lookup failed, reading durable store");
            }
        }

        let entry = match self.store.get(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(key = %key, "Value not set");
                return String::new();
            }
            Err(e) => {
                error!(key = %key, error = %e, "Durable store lookup failed");
                return String::new();
            }
        };

        self.local.put(key, &entry.value);
        if let Err(e) = self.cache.set(key, &entry.value).await {
            warn!(key = %key, error = %e, "Failed to backfill distributed cache");
        }

        entry.value
    }

    /// Get values for many keys in batched round trips.
    ///
    /// The result has an entry for every requested key; keys no tier
    /// resolves map to the empty string, as do keys that could never be
    /// stored; those are not sent to any backend, so one bad key cannot
    /// spoil the batch. Warming matches [`Self::get`]:
    /// the local tier is consulted first and filled with everything resolved
    /// further down.
    pub async fn get_multi<K: AsRef<str>>(&self, keys: &[K]) -> HashMap<String, String> {
        let mut resolved = HashMap::with_capacity(keys.len());
        let mut seen = HashSet::with_capacity(keys.len());
        let mut pending = Vec::new();

        for key in keys {
            let key = key.as_ref();
            if !seen.insert(key) {
                continue;
            }
            if validate_key(key).is_err() {
                debug!(key = %key, "Unstorable key reads as empty");
                resolved.insert(key.to_string(), String::new());
                continue;
            }
            match self.local.get(key) {
                Some(value) => {
                    resolved.insert(key.to_string(), value);
                }
                None => pending.push(key.to_string()),
            }
        }

        if pending.is_empty() {
            return resolved;
        }

        match self.cache.get_multi(&pending).await {
            Ok(hits) => {
                for (key, value) in hits {
                    if seen.contains(key.as_str()) {
                        self.local.put(&key, &value);
                        resolved.insert(key, value);
                    }
                }
            }
            Err(e) => {
                warn!(keys = pending.len(), error = %e, "Distributed cache multi-get failed, reading durable store");
            }
        }

        pending.retain(|key| !resolved.contains_key(key));
        if pending.is_empty() {
            return resolved;
        }

        match self.store.get_multi(&pending).await {
            Ok(found) => {
                let mut backfill = Vec::with_capacity(found.len());
                for (key, value) in found {
                    if !seen.contains(key.as_str()) {
                        continue;
                    }
                    self.local.put(&key, &value);
                    backfill.push(Entry::new(key.clone(), value.clone()));
                    resolved.insert(key, value);
                }

                if !backfill.is_empty() {
                    if let Err(e) = self.cache.set_multi(&backfill).await {
                        warn!(keys = backfill.len(), error = %e, "Failed to backfill distributed cache");
                    }
                }
            }
            Err(e) => {
                error!(keys = pending.len(), error = %e, "Durable store multi-get failed");
            }
        }

        for key in pending {
            resolved.entry(key).or_default();
        }

        resolved
    }

    /// Set `key` to `value`, failing if the key already exists in any tier.
    ///
    /// The durable transaction decides; concurrent calls for one key commit
    /// at most once and every other caller gets `AlreadyExists`. A
    /// distributed cache that cannot be checked fails the write with
    /// `BackendUnavailable` before any transaction starts. Caches are not
    /// filled on success; the next read backfills them.
    pub async fn set(&self, key: &str, value: &str) -> ValetResult<()> {
        validate_key(key)?;

        if self.local.get(key).is_some() {
            return Err(already_exists(key, Tier::Local));
        }

        match self.cache.get(key).await {
            CacheLookup::Hit(_) => return Err(already_exists(key, Tier::Distributed)),
            CacheLookup::Miss => {}
            CacheLookup::Unavailable(e) => {
                error!(key = %key, error = %e, "Distributed cache check failed, refusing write");
                return Err(e);
            }
        }

        self.store
            .run_in_transaction(key, |txn| {
                if txn.get()?.is_some() {
                    return Err(already_exists(txn.key(), Tier::Durable));
                }
                txn.put(value)
            })
            .await?;

        info!(key = %key, "Value committed");
        Ok(())
    }

    /// Delete `key` from the distributed cache and the durable store.
    ///
    /// Deleting a missing key succeeds. This process's local cache is
    /// evicted too; other processes are not reached.
    pub async fn delete(&self, key: &str) -> ValetResult<()> {
        if let Err(e) = self.cache.delete(key).await {
            error!(key = %key, error = %e, "Failed to delete from distributed cache");
            return Err(e);
        }

        let removal = match self.store.delete(key).await {
            Ok(removal) => removal,
            Err(e) => {
                error!(key = %key, error = %e, "Failed to delete from durable store");
                return Err(e);
            }
        };

        self.local.remove(key);

        match removal {
            Removal::Removed => info!(key = %key, "Value deleted"),
            Removal::NotFound => debug!(key = %key, "Delete of absent value"),
        }
        Ok(())
    }

    /// Every committed entry, ordered by key. Reads the durable store only.
    pub async fn list_all(&self) -> ValetResult<Vec<Entry>> {
        self.store.list_all().await
    }
}

impl<L, C, S> Clone for ValueResolver<L, C, S>
where
    L: LocalCache,
    C: DistributedCache,
    S: DurableStore,
{
    fn clone(&self) -> Self {
        Self {
            local: Arc::clone(&self.local),
            cache: Arc::clone(&self.cache),
            store: Arc::clone(&self.store),
        }
    }
}

fn already_exists(key: &str, tier: Tier) -> valet_core::ValetError {
    StoreError::AlreadyExists {
        key: key.to_string(),
        tier,
    }
    .into()
}
