//! Cache tier traits and lookup outcomes.
//!
//! This module defines the capabilities the resolver needs from each cache
//! tier.

use std::collections::HashMap;

use async_trait::async_trait;
use valet_core::{Entry, Removal, ValetError, ValetResult};

/// Process-local cache tier.
///
/// Implementations are shared by every request in the process. Writes are
/// plain overwrites, so two requests backfilling the same key race harmlessly.
pub trait LocalCache: Send + Sync {
    /// Get a value, or `None` if this process has not resolved the key.
    fn get(&self, key: &str) -> Option<String>;

    /// Store a resolved value.
    fn put(&self, key: &str, value: &str);

    /// Drop a key. Returns whether it was present.
    fn remove(&self, key: &str) -> bool;
}

/// Outcome of a single distributed cache lookup.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// The cache holds a value for the key.
    Hit(String),
    /// The cache answered and holds nothing.
    Miss,
    /// The cache could not be reached or failed to answer.
    Unavailable(ValetError),
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    /// The value on a hit, `None` otherwise.
    pub fn into_value(self) -> Option<String> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            _ => None,
        }
    }
}

/// Shared best-effort cache tier.
///
/// Keys passed in and returned are the caller's keys; any prefixing is the
/// implementation's concern. There is no TTL: entries live until evicted or
/// deleted.
#[async_trait]
pub trait DistributedCache: Send + Sync {
    /// Look up one key.
    async fn get(&self, key: &str) -> CacheLookup;

    /// Look up many keys at once.
    ///
    /// The returned map holds only the keys that were found.
    async fn get_multi(&self, keys: &[String]) -> ValetResult<HashMap<String, String>>;

    /// Store one value.
    async fn set(&self, key: &str, value: &str) -> ValetResult<()>;

    /// Store many values at once.
    async fn set_multi(&self, entries: &[Entry]) -> ValetResult<()>;

    /// Remove one key. A missing key is reported, not an error.
    async fn delete(&self, key: &str) -> ValetResult<Removal>;

    /// Get cache statistics.
    async fn stats(&self) -> ValetResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Entries dropped by the cache rather than by an explicit delete.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valet_core::{StoreError, Tier};

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_lookup_into_value() {
        assert_eq!(
            CacheLookup::Hit("v".to_string()).into_value(),
            Some("v".to_string())
        );
        assert_eq!(CacheLookup::Miss.into_value(), None);

        let down = CacheLookup::Unavailable(
            StoreError::BackendUnavailable {
                tier: Tier::Distributed,
                reason: "timeout".to_string(),
            }
            .into(),
        );
        assert!(!down.is_hit());
        assert_eq!(down.into_value(), None);
    }
}
