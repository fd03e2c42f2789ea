//! The durable store: the source of truth.
//!
//! One record per key lives in a single namespace. A record's presence means
//! the value is committed; its absence means the key is unset. The only
//! write primitive is [`DurableStore::run_in_transaction`], scoped to one key,
//! which is what makes set-if-absent safe against concurrent writers.

pub mod lmdb_store;
pub mod memory;
pub mod traits;

pub use lmdb_store::LmdbDurableStore;
pub use memory::MemoryDurableStore;
pub use traits::{DurableStore, RecordTxn, StoredRecord};
