//! Error types for Valet operations

use crate::Tier;
use thiserror::Error;

/// Storage layer errors.
///
/// A missing key is not an error at this level: lookups return `Option`,
/// cache reads return a miss, and deletes report `Removal::NotFound`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Key {key:?} already exists in the {tier} tier")]
    AlreadyExists { key: String, tier: Tier },

    #[error("{tier} backend unavailable: {reason}")]
    BackendUnavailable { tier: Tier, reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Key must not be empty")]
    EmptyKey,

    #[error("Key is {len} bytes, maximum is {max}")]
    KeyTooLong { len: usize, max: usize },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Administrative access errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Sign in required, log in at {login_path}")]
    Unauthenticated { login_path: String },

    #[error("Forbidden: {principal} is not an administrator")]
    Forbidden { principal: String },
}

/// Master error type for all Valet errors.
#[derive(Debug, Clone, Error)]
pub enum ValetError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Access error: {0}")]
    Access(#[from] AccessError),
}

impl ValetError {
    /// Shorthand for a backend failure at `tier`.
    pub fn unavailable(tier: Tier, reason: impl Into<String>) -> Self {
        StoreError::BackendUnavailable {
            tier,
            reason: reason.into(),
        }
        .into()
    }

    /// True for a write-once conflict at any tier.
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            ValetError::Storage(StoreError::AlreadyExists { .. })
        )
    }

    /// The tier that reported a write-once conflict, if any.
    pub fn conflicting_tier(&self) -> Option<Tier> {
        match self {
            ValetError::Storage(StoreError::AlreadyExists { tier, .. }) => Some(*tier),
            _ => None,
        }
    }
}

/// Result type alias for Valet operations.
pub type ValetResult<T> = Result<T, ValetError>;

// =============================================================================
// TESTS
// =============================================================================
