//! LMDB-backed durable store.
//!
//! Each namespace is an LMDB named database; each record is the JSON form of
//! a [`StoredRecord`]. LMDB serializes write transactions across every
//! process mapping the environment, so a read-then-write inside
//! `run_in_transaction` is atomic per key without any application lock.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use heed::types::{Bytes, Str};
use heed::{Database, Env, RwTxn};
use valet_core::{Entry, Removal, StoreError, Tier, ValetConfig, ValetError, ValetResult};

use super::traits::{DurableStore, RecordTxn, StoredRecord};
use crate::lmdb::{open_env, txn_error, LmdbStoreError};

/// LMDB-backed durable store for one namespace.
///
/// # Example
///
/// ```ignore
/// use valet_storage::durable::LmdbDurableStore;
///
/// let store = LmdbDurableStore::open("/var/lib/valet", "Values", 64)?;
/// let entry = store.get("oauth_client_secret").await?;
/// ```
pub struct LmdbDurableStore {
    /// The LMDB environment.
    env: Env,
    /// Records of this namespace.
    db: Database<Str, Bytes>,
    /// Namespace (database name).
    namespace: String,
}

impl LmdbDurableStore {
    /// Open a durable store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `namespace` - Name of the database holding the records
    /// * `max_size_mb` - Maximum size of the environment in megabytes
    pub fn open<P: AsRef<Path>>(
        path: P,
        namespace: &str,
        max_size_mb: usize,
    ) -> Result<Self, LmdbStoreError> {
        let env = open_env(path, max_size_mb, 4)?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, Some(namespace))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            namespace: namespace.to_string(),
        })
    }

    /// Open the durable store described by `config`.
    pub fn from_config(config: &ValetConfig) -> Result<Self, LmdbStoreError> {
        Self::open(
            &config.durable_path,
            &config.namespace,
            config.durable_map_size_mb,
        )
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

fn encode_record(value: &str) -> ValetResult<Vec<u8>> {
    serde_json::to_vec(&StoredRecord {
        value: value.to_string(),
    })
    .map_err(|e| {
        StoreError::TransactionFailed {
            reason: format!("failed to encode record: {}", e),
        }
        .into()
    })
}

fn decode_record(key: &str, bytes: &[u8]) -> ValetResult<String> {
    serde_json::from_slice::<StoredRecord>(bytes)
        .map(|record| record.value)
        .map_err(|e| {
            LmdbStoreError::CorruptRecord {
                key: key.to_string(),
                reason: e.to_string(),
            }
            .at(Tier::Durable)
        })
}

/// Transaction view over one key inside an LMDB write transaction.
struct LmdbRecordTxn<'t, 'p> {
    db: Database<Str, Bytes>,
    wtxn: &'t mut RwTxn<'p>,
    key: &'t str,
}

impl RecordTxn for LmdbRecordTxn<'_, '_> {
    fn key(&self) -> &str {
        self.key
    }

    fn get(&mut self) -> ValetResult<Option<String>> {
        match self
            .db
            .get(&*self.wtxn, self.key)
            .map_err(txn_error(Tier::Durable))?
        {
            Some(bytes) => decode_record(self.key, bytes).map(Some),
            None => Ok(None),
        }
    }

    fn put(&mut self, value: &str) -> ValetResult<()> {
        let bytes = encode_record(value)?;
        self.db
            .put(&mut *self.wtxn, self.key, bytes.as_slice())
            .map_err(txn_error(Tier::Durable))
    }
}

#[async_trait]
impl DurableStore for LmdbDurableStore {
    async fn get(&self, key: &str) -> ValetResult<Option<Entry>> {
        let rtxn = self.env.read_txn().map_err(txn_error(Tier::Durable))?;
        match self.db.get(&rtxn, key).map_err(txn_error(Tier::Durable))? {
            Some(bytes) => Ok(Some(Entry::new(key, decode_record(key, bytes)?))),
            None => Ok(None),
        }
    }

    async fn get_multi(&self, keys: &[String]) -> ValetResult<HashMap<String, String>> {
        let rtxn = self.env.read_txn().map_err(txn_error(Tier::Durable))?;

        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self
                .db
                .get(&rtxn, key.as_str())
                .map_err(txn_error(Tier::Durable))?
            {
                found.insert(key.clone(), decode_record(key, bytes)?);
            }
        }
        Ok(found)
    }

    async fn run_in_transaction<T, F>(&self, key: &str, body: F) -> ValetResult<T>
    where
        T: Send,
        F: FnOnce(&mut dyn RecordTxn) -> ValetResult<T> + Send,
    {
        let mut wtxn = self.env.write_txn().map_err(txn_error(Tier::Durable))?;

        let outcome = {
            let mut txn = LmdbRecordTxn {
                db: self.db,
                wtxn: &mut wtxn,
                key,
            };
            body(&mut txn)
        };

        match outcome {
            Ok(out) => {
                wtxn.commit().map_err(|e| -> ValetError {
                    StoreError::TransactionFailed {
                        reason: e.to_string(),
                    }
                    .into()
                })?;
                Ok(out)
            }
            Err(e) => {
                // Dropping an uncommitted write transaction aborts it.
                drop(wtxn);
                Err(e)
            }
        }
    }

    async fn delete(&self, key: &str) -> ValetResult<Removal> {
        let mut wtxn = self.env.write_txn().map_err(txn_error(Tier::Durable))?;
        let deleted = self
            .db
            .delete(&mut wtxn, key)
            .map_err(txn_error(Tier::Durable))?;
        wtxn.commit().map_err(txn_error(Tier::Durable))?;

        Ok(if deleted {
            Removal::Removed
        } else {
            Removal::NotFound
        })
    }

    async fn list_all(&self) -> ValetResult<Vec<Entry>> {
        let rtxn = self.env.read_txn().map_err(txn_error(Tier::Durable))?;

        let mut entries = Vec::new();
        for result in self.db.iter(&rtxn).map_err(txn_error(Tier::Durable))? {
            let (key, bytes) = result.map_err(txn_error(Tier::Durable))?;
            entries.push(Entry::new(key, decode_record(key, bytes)?));
        }
        Ok(entries)
    }
}
