//! VALET Storage - Tiered value resolution
//!
//! Values are resolved through three tiers, fastest first:
//!
//! 1. a process-local cache ([`LocalCache`]),
//! 2. a distributed cache shared by every process ([`DistributedCache`]),
//! 3. the durable store, the source of truth ([`DurableStore`]).
//!
//! [`ValueResolver`] walks the tiers on reads and backfills whatever missed.
//! Writes go to the durable store only, through a per-key transaction that
//! makes every key write-once.

pub mod cache;
pub mod durable;
pub mod lmdb;
pub mod registry;
pub mod resolver;

pub use cache::{
    CacheLookup, CacheStats, DistributedCache, KeyPrefix, LmdbDistributedCache, LocalCache,
    MemoryDistributedCache, MemoryLocalCache,
};
pub use durable::{DurableStore, LmdbDurableStore, MemoryDurableStore, RecordTxn, StoredRecord};
pub use lmdb::LmdbStoreError;
pub use registry::{RegisteredValue, ValueRegistry};
pub use resolver::ValueResolver;
