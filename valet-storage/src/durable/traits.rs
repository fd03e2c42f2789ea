//! Durable store traits.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use valet_core::{Entry, Removal, ValetResult};

/// On-disk form of a record: a single unindexed string field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub value: String,
}

/// Access to one key's record inside a durable transaction.
///
/// Writes made through `put` become visible only if the transaction
/// commits. Returning an error from the transaction body aborts it.
pub trait RecordTxn {
    /// The key this transaction is scoped to.
    fn key(&self) -> &str;

    /// Read the record as of this transaction.
    fn get(&mut self) -> ValetResult<Option<String>>;

    /// Stage a new value for the record.
    fn put(&mut self, value: &str) -> ValetResult<()>;
}

/// Durable key/value store for committed entries.
///
/// Implementations must make `run_in_transaction` atomic per key: two
/// concurrent transactions for the same key must not both observe the record
/// as absent and both commit.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Look up one key.
    async fn get(&self, key: &str) -> ValetResult<Option<Entry>>;

    /// Look up many keys in one round trip.
    ///
    /// The returned map holds only the keys that have a record.
    async fn get_multi(&self, keys: &[String]) -> ValetResult<HashMap<String, String>>;

    /// Run `body` in a transaction scoped to `key`.
    ///
    /// The transaction commits when `body` returns `Ok` and aborts when it
    /// returns `Err`, which is passed through unchanged.
    async fn run_in_transaction<T, F>(&self, key: &str, body: F) -> ValetResult<T>
    where
        T: Send,
        F: FnOnce(&mut dyn RecordTxn) -> ValetResult<T> + Send;

    /// Remove one key. A missing key is reported, not an error.
    async fn delete(&self, key: &str) -> ValetResult<Removal>;

    /// Every committed entry, ordered by key.
    async fn list_all(&self) -> ValetResult<Vec<Entry>>;
}
