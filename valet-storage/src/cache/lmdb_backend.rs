//! LMDB-backed shared cache.
//!
//! Every process on a host that maps the same directory sees the same
//! entries, which makes the environment a distributed cache tier for the
//! processes of one machine. Entries are stored under
//! `prefix + key` as plain UTF-8 strings.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The backend uses:
//! - Read transactions for `get` and `get_multi`
//! - Write transactions for `set`, `set_multi`, and `delete`
//! - Statistics are tracked behind a lock, best-effort

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use heed::types::Str;
use heed::{Database, Env};
use valet_core::{Entry, Removal, Tier, ValetConfig, ValetResult};

use super::prefix::KeyPrefix;
use super::traits::{CacheLookup, CacheStats, DistributedCache};
use crate::lmdb::{open_env, txn_error, LmdbStoreError};

/// Name of the LMDB database holding cache entries.
const CACHE_DB_NAME: &str = "valet-cache";

/// LMDB-backed distributed cache.
///
/// # Example
///
/// ```ignore
/// use valet_storage::cache::LmdbDistributedCache;
///
/// let cache = LmdbDistributedCache::open("/var/cache/valet", "app:", 32)?;
/// cache.set("oauth_client_secret", "s3cr3t").await?;
/// assert!(cache.get("oauth_client_secret").await.is_hit());
/// ```
pub struct LmdbDistributedCache {
    /// The LMDB environment.
    env: Env,
    /// Cache entries keyed by prefixed key.
    db: Database<Str, Str>,
    /// Prefix applied to every key.
    prefix: KeyPrefix,
    /// Statistics for this process's view of the cache.
    stats: RwLock<CacheStats>,
}

impl LmdbDistributedCache {
    /// Open a shared cache.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `prefix` - Prefix applied to every key
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn open<P: AsRef<Path>>(
        path: P,
        prefix: impl Into<String>,
        max_size_mb: usize,
    ) -> Result<Self, LmdbStoreError> {
        let env = open_env(path, max_size_mb, 1)?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Str, Str> = env
            .create_database(&mut wtxn, Some(CACHE_DB_NAME))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            prefix: KeyPrefix::new(prefix),
            stats: RwLock::new(CacheStats::default()),
        })
    }

    /// Open the shared cache described by `config`.
    pub fn from_config(config: &ValetConfig) -> Result<Self, LmdbStoreError> {
        Self::open(
            &config.cache_path,
            config.cache_key_prefix.clone(),
            config.cache_map_size_mb,
        )
    }

    /// The key prefix in use.
    pub fn prefix(&self) -> &KeyPrefix {
        &self.prefix
    }

    fn record(&self, hits: u64, misses: u64) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += hits;
            stats.misses += misses;
        }
    }

    fn entry_count(&self) -> ValetResult<u64> {
        let rtxn = self.env.read_txn().map_err(txn_error(Tier::Distributed))?;
        let count = self
            .db
            .len(&rtxn)
            .map_err(txn_error(Tier::Distributed))?;
        Ok(count)
    }
}

#[async_trait]
impl DistributedCache for LmdbDistributedCache {
    async fn get(&self, key: &str) -> CacheLookup {
        let encoded = self.prefix.encode(key);

        let rtxn = match self.env.read_txn() {
            Ok(rtxn) => rtxn,
            Err(e) => return CacheLookup::Unavailable(txn_error(Tier::Distributed)(e)),
        };

        match self.db.get(&rtxn, encoded.as_str()) {
            Ok(Some(value)) => {
                self.record(1, 0);
                CacheLookup::Hit(value.to_string())
            }
            Ok(None) => {
                self.record(0, 1);
                CacheLookup::Miss
            }
            Err(e) => {
                self.record(0, 1);
                CacheLookup::Unavailable(txn_error(Tier::Distributed)(e))
            }
        }
    }

    async fn get_multi(&self, keys: &[String]) -> ValetResult<HashMap<String, String>> {
        let rtxn = self.env.read_txn().map_err(txn_error(Tier::Distributed))?;

        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            let encoded = self.prefix.encode(key);
            if let Some(value) = self
                .db
                .get(&rtxn, encoded.as_str())
                .map_err(txn_error(Tier::Distributed))?
            {
                found.insert(key.clone(), value.to_string());
            }
        }

        self.record(found.len() as u64, (keys.len() - found.len()) as u64);
        Ok(found)
    }

    async fn set(&self, key: &str, value: &str) -> ValetResult<()> {
        let encoded = self.prefix.encode(key);

        let mut wtxn = self.env.write_txn().map_err(txn_error(Tier::Distributed))?;
        self.db
            .put(&mut wtxn, encoded.as_str(), value)
            .map_err(txn_error(Tier::Distributed))?;
        wtxn.commit().map_err(txn_error(Tier::Distributed))?;

        Ok(())
    }

    async fn set_multi(&self, entries: &[Entry]) -> ValetResult<()> {
        let mut wtxn = self.env.write_txn().map_err(txn_error(Tier::Distributed))?;
        for entry in entries {
            let encoded = self.prefix.encode(&entry.key);
            self.db
                .put(&mut wtxn, encoded.as_str(), entry.value.as_str())
                .map_err(txn_error(Tier::Distributed))?;
        }
        wtxn.commit().map_err(txn_error(Tier::Distributed))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> ValetResult<Removal> {
        let encoded = self.prefix.encode(key);

        let mut wtxn = self.env.write_txn().map_err(txn_error(Tier::Distributed))?;
        let deleted = self
            .db
            .delete(&mut wtxn, encoded.as_str())
            .map_err(txn_error(Tier::Distributed))?;
        wtxn.commit().map_err(txn_error(Tier::Distributed))?;

        Ok(if deleted {
            Removal::Removed
        } else {
            Removal::NotFound
        })
    }

    async fn stats(&self) -> ValetResult<CacheStats> {
        let mut stats = self.stats.read().map(|s| s.clone()).unwrap_or_default();
        stats.entry_count = self.entry_count()?;
        Ok(stats)
    }
}
