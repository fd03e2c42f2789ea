//! In-memory distributed cache.
//!
//! Stands in for a networked cache in tests and single-process deployments.
//! It can be switched to an unavailable state and can evict keys on demand,
//! which is how callers exercise the resolver's fallback paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use valet_core::{Entry, Removal, StoreError, Tier, ValetError, ValetResult};

use super::prefix::KeyPrefix;
use super::traits::{CacheLookup, CacheStats, DistributedCache};

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct CacheOpCounts {
    pub gets: AtomicU64,
    pub get_multis: AtomicU64,
    pub sets: AtomicU64,
    pub set_multis: AtomicU64,
    pub deletes: AtomicU64,
}

/// Distributed cache held in process memory.
#[derive(Debug, Default)]
pub struct MemoryDistributedCache {
    /// Entries keyed by their prefixed form.
    entries: RwLock<HashMap<String, String>>,
    prefix: KeyPrefix,
    unavailable: AtomicBool,
    stats: RwLock<CacheStats>,
    ops: CacheOpCounts,
}

impl MemoryDistributedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache that stores keys under `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: KeyPrefix::new(prefix),
            ..Self::default()
        }
    }

    /// Make every subsequent operation fail as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Drop a key the way a cache under memory pressure would.
    pub fn evict(&self, key: &str) -> bool {
        let evicted = self
            .entries
            .write()
            .map(|mut entries| entries.remove(&self.prefix.encode(key)).is_some())
            .unwrap_or(false);
        if evicted {
            if let Ok(mut stats) = self.stats.write() {
                stats.evictions += 1;
                stats.entry_count = stats.entry_count.saturating_sub(1);
            }
        }
        evicted
    }

    /// Read a key without touching statistics or the availability switch.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(&self.prefix.encode(key)).cloned())
    }

    /// Read a raw, already-prefixed key.
    pub fn peek_raw(&self, raw_key: &str) -> Option<String> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(raw_key).cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Operation counters since construction.
    pub fn ops(&self) -> &CacheOpCounts {
        &self.ops
    }

    fn check_available(&self) -> ValetResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::BackendUnavailable {
                tier: Tier::Distributed,
                reason: "memory cache switched off".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn lock_error() -> ValetError {
        StoreError::LockPoisoned.into()
    }

    fn record(&self, hits: u64, misses: u64) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += hits;
            stats.misses += misses;
        }
    }

    fn insert_all<'a>(&self, pairs: impl Iterator<Item = (&'a str, &'a str)>) -> ValetResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::lock_error())?;
        for (key, value) in pairs {
            entries.insert(self.prefix.encode(key), value.to_string());
        }
        let count = entries.len() as u64;
        drop(entries);
        if let Ok(mut stats) = self.stats.write() {
            stats.entry_count = count;
        }
        Ok(())
    }
}

#[async_trait]
impl DistributedCache for MemoryDistributedCache {
    async fn get(&self, key: &str) -> CacheLookup {
        self.ops.gets.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = self.check_available() {
            return CacheLookup::Unavailable(e);
        }
        let found = match self.entries.read() {
            Ok(entries) => entries.get(&self.prefix.encode(key)).cloned(),
            Err(_) => return CacheLookup::Unavailable(Self::lock_error()),
        };
        match found {
            Some(value) => {
                self.record(1, 0);
                CacheLookup::Hit(value)
            }
            None => {
                self.record(0, 1);
                CacheLookup::Miss
            }
        }
    }

    async fn get_multi(&self, keys: &[String]) -> ValetResult<HashMap<String, String>> {
        self.ops.get_multis.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        let entries = self.entries.read().map_err(|_| Self::lock_error())?;
        let found: HashMap<String, String> = keys
            .iter()
            .filter_map(|key| {
                entries
                    .get(&self.prefix.encode(key))
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect();
        drop(entries);
        self.record(found.len() as u64, (keys.len() - found.len()) as u64);
        Ok(found)
    }

    async fn set(&self, key: &str, value: &str) -> ValetResult<()> {
        self.ops.sets.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        self.insert_all(std::iter::once((key, value)))
    }

    async fn set_multi(&self, entries: &[Entry]) -> ValetResult<()> {
        self.ops.set_multis.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        self.insert_all(
            entries
                .iter()
                .map(|entry| (entry.key.as_str(), entry.value.as_str())),
        )
    }

    async fn delete(&self, key: &str) -> ValetResult<Removal> {
        self.ops.deletes.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        let mut entries = self.entries.write().map_err(|_| Self::lock_error())?;
        let removed = entries.remove(&self.prefix.encode(key)).is_some();
        let count = entries.len() as u64;
        drop(entries);
        if let Ok(mut stats) = self.stats.write() {
            stats.entry_count = count;
        }
        Ok(if removed {
            Removal::Removed
        } else {
            Removal::NotFound
        })
    }

    async fn stats(&self) -> ValetResult<CacheStats> {
        Ok(self.stats.read().map(|s| s.clone()).unwrap_or_default())
    }
}
