//! Cache tiers in front of the durable store.
//!
//! Two tiers sit ahead of the source of truth:
//!
//! - [`LocalCache`]: memory private to one process. Fastest, never expires,
//!   lost on restart.
//! - [`DistributedCache`]: shared between processes, best-effort. Entries can
//!   vanish at any time and every operation may fail.
//!
//! Neither tier is authoritative. A distributed lookup reports its outcome as
//! a [`CacheLookup`], so a miss and an unreachable backend are distinct values
//! rather than an error the caller has to remember to swallow.
//!
//! # Example
//!
//! ```ignore
//! match cache.get("oauth_client_secret").await {
//!     CacheLookup::Hit(value) => value,
//!     CacheLookup::Miss => fetch_from_store().await,
//!     CacheLookup::Unavailable(e) => {
//!         tracing::warn!(error = %e, "cache down");
//!         fetch_from_store().await
//!     }
//! }
//! ```

pub mod lmdb_backend;
pub mod local;
pub mod memory;
pub mod prefix;
pub mod traits;

pub use lmdb_backend::LmdbDistributedCache;
pub use local::MemoryLocalCache;
pub use memory::MemoryDistributedCache;
pub use prefix::KeyPrefix;
pub use traits::{CacheLookup, CacheStats, DistributedCache, LocalCache};
