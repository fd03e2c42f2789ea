//! LMDB environment handling shared by the durable store and the shared cache.
//!
//! Uses the heed crate (Rust bindings for LMDB). LMDB allows one write
//! transaction at a time per environment, across every process that maps it,
//! which is what the durable store relies on for write-once admission.

use std::path::Path;

use heed::{Env, EnvOpenOptions};
use valet_core::{StoreError, Tier, ValetError};

/// Error type for LMDB operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A stored record could not be decoded.
    #[error("Corrupt record for key {key:?}: {reason}")]
    CorruptRecord { key: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LmdbStoreError {
    /// Attribute this failure to a tier.
    pub fn at(self, tier: Tier) -> ValetError {
        StoreError::BackendUnavailable {
            tier,
            reason: self.to_string(),
        }
        .into()
    }
}

/// Convert LmdbStoreError to ValetError.
impl From<LmdbStoreError> for ValetError {
    fn from(e: LmdbStoreError) -> Self {
        ValetError::Storage(StoreError::TransactionFailed {
            reason: e.to_string(),
        })
    }
}

/// Open (creating if needed) an LMDB environment.
///
/// # Arguments
///
/// * `path` - Directory where LMDB files will be stored
/// * `max_size_mb` - Maximum size of the map in megabytes
/// * `max_dbs` - Number of named databases the environment may hold
pub(crate) fn open_env<P: AsRef<Path>>(
    path: P,
    max_size_mb: usize,
    max_dbs: u32,
) -> Result<Env, LmdbStoreError> {
    // Ensure directory exists
    std::fs::create_dir_all(&path)?;

    // SAFETY: the environment is opened once per directory by this process
    // and the map is never truncated while mapped.
    unsafe {
        EnvOpenOptions::new()
            .map_size(max_size_mb * 1024 * 1024)
            .max_dbs(max_dbs)
            .open(path.as_ref())
    }
    .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))
}

/// Shorthand used by backends to tag heed errors with their tier.
pub(crate) fn txn_error(tier: Tier) -> impl Fn(heed::Error) -> ValetError {
    move |e| LmdbStoreError::Transaction(e.to_string()).at(tier)
}
