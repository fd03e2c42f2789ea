//! In-memory durable store.
//!
//! Holds records in a `BTreeMap` behind a lock. Transactions take the write
//! lock for their whole body, so transactions on the store are serialized,
//! matching the single-writer model of the LMDB store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use valet_core::{Entry, Removal, StoreError, Tier, ValetConfig, ValetError, ValetResult};

use super::traits::{DurableStore, RecordTxn};

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct StoreOpCounts {
    pub gets: AtomicU64,
    pub get_multis: AtomicU64,
    pub transactions: AtomicU64,
    pub commits: AtomicU64,
    pub deletes: AtomicU64,
}

/// Durable store held in process memory.
#[derive(Debug)]
pub struct MemoryDurableStore {
    namespace: String,
    records: RwLock<BTreeMap<String, String>>,
    unavailable: AtomicBool,
    ops: StoreOpCounts,
}

impl Default for MemoryDurableStore {
    fn default() -> Self {
        Self::with_namespace(valet_core::config::DEFAULT_NAMESPACE)
    }
}

impl MemoryDurableStore {
    /// Create a new in-memory store using the default namespace.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            records: RwLock::new(BTreeMap::new()),
            unavailable: AtomicBool::new(false),
            ops: StoreOpCounts::default(),
        }
    }

    pub fn from_config(config: &ValetConfig) -> Self {
        Self::with_namespace(config.namespace.clone())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Write a record directly, bypassing write-once admission.
    ///
    /// Used to seed fixtures, including deliberately inconsistent ones.
    pub fn insert_unchecked(&self, key: &str, value: &str) {
        if let Ok(mut records) = self.records.write() {
            records.insert(key.to_string(), value.to_string());
        }
    }

    /// Read a record without touching counters or the availability switch.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.records
            .read()
            .ok()
            .and_then(|records| records.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent operation fail as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Operation counters since construction.
    pub fn ops(&self) -> &StoreOpCounts {
        &self.ops
    }

    fn check_available(&self) -> ValetResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ValetError::unavailable(
                Tier::Durable,
                format!("memory store {:?} switched off", self.namespace),
            ));
        }
        Ok(())
    }
}

/// Transaction view over one key of the locked record map.
struct MemoryTxn<'a> {
    key: &'a str,
    records: &'a BTreeMap<String, String>,
    staged: Option<String>,
}

impl RecordTxn for MemoryTxn<'_> {
    fn key(&self) -> &str {
        self.key
    }

    fn get(&mut self) -> ValetResult<Option<String>> {
        if let Some(staged) = &self.staged {
            return Ok(Some(staged.clone()));
        }
        Ok(self.records.get(self.key).cloned())
    }

    fn put(&mut self, value: &str) -> ValetResult<()> {
        self.staged = Some(value.to_string());
        Ok(())
    }
}

#[async_trait]
impl DurableStore for MemoryDurableStore {
    async fn get(&self, key: &str) -> ValetResult<Option<Entry>> {
        self.ops.gets.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records
            .get(key)
            .map(|value| Entry::new(key, value.clone())))
    }

    async fn get_multi(&self, keys: &[String]) -> ValetResult<HashMap<String, String>> {
        self.ops.get_multis.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(keys
            .iter()
            .filter_map(|key| records.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    async fn run_in_transaction<T, F>(&self, key: &str, body: F) -> ValetResult<T>
    where
        T: Send,
        F: FnOnce(&mut dyn RecordTxn) -> ValetResult<T> + Send,
    {
        self.ops.transactions.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;

        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        let (out, staged) = {
            let mut txn = MemoryTxn {
                key,
                records: &*records,
                staged: None,
            };
            // An error here drops the staged write, aborting the transaction.
            let out = body(&mut txn)?;
            (out, txn.staged)
        };

        if let Some(value) = staged {
            records.insert(key.to_string(), value);
        }
        self.ops.commits.fetch_add(1, Ordering::Relaxed);
        Ok(out)
    }

    async fn delete(&self, key: &str) -> ValetResult<Removal> {
        self.ops.deletes.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(match records.remove(key) {
            Some(_) => Removal::Removed,
            None => Removal::NotFound,
        })
    }

    async fn list_all(&self) -> ValetResult<Vec<Entry>> {
        self.check_available()?;
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records
            .iter()
            .map(|(key, value)| Entry::new(key.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryDurableStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.namespace(), "Values");
    }

    #[tokio::test]
    async fn test_transaction_commits_put() {
        let store = MemoryDurableStore::new();
        store
            .run_in_transaction("k", |txn| {
                assert_eq!(txn.key(), "k");
                assert_eq!(txn.get()?, None);
                txn.put("v")?;
                // Reads inside the transaction see the staged write.
                assert_eq!(txn.get()?, Some("v".to_string()));
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(Entry::new("k", "v")));
        assert_eq!(store.ops().commits.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_transaction_error_aborts() {
        let store = MemoryDurableStore::new();
        let result: ValetResult<()> = store
            .run_in_transaction("k", |txn| {
                txn.put("v")?;
                Err(StoreError::TransactionFailed {
                    reason: "body failed".to_string(),
                }
                .into())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.peek("k"), None);
        assert_eq!(store.ops().commits.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_get_multi_partial() {
        let store = MemoryDurableStore::new();
        store.insert_unchecked("a", "1");
        store.insert_unchecked("b", "2");

        let keys = vec!["a".to_string(), "c".to_string()];
        let found = store.get_multi(&keys).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["a"], "1");
    }

    #[tokio::test]
    async fn test_delete_reports_missing() {
        let store = MemoryDurableStore::new();
        store.insert_unchecked("k", "v");
        assert_eq!(store.delete("k").await.unwrap(), Removal::Removed);
        assert_eq!(store.delete("k").await.unwrap(), Removal::NotFound);
    }

    #[tokio::test]
    async fn test_list_all_sorted() {
        let store = MemoryDurableStore::new();
        store.insert_unchecked("zeta", "1");
        store.insert_unchecked("alpha", "2");
        let keys: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = MemoryDurableStore::new();
        store.set_unavailable(true);
        let err = store.get("k").await.unwrap_err();
        assert!(matches!(
            err,
            ValetError::Storage(StoreError::BackendUnavailable {
                tier: Tier::Durable,
                ..
            })
        ));
        assert!(store.run_in_transaction("k", |_| Ok(())).await.is_err());
    }
}
