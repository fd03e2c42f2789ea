//! Entry, tier, and removal types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Largest key LMDB will store.
pub const BACKEND_MAX_KEY_BYTES: usize = 511;

/// Largest key accepted by the write path.
///
/// The distributed cache prepends its prefix, so the limit leaves room for
/// a prefix of up to `BACKEND_MAX_KEY_BYTES - MAX_KEY_BYTES` bytes.
pub const MAX_KEY_BYTES: usize = 448;

/// A committed key/value pair.
///
/// Once an `Entry` is durably stored it is immutable until deleted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One layer in the fallback chain, fastest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Process-local memory.
    Local,
    /// Shared best-effort cache.
    Distributed,
    /// Source of truth.
    Durable,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Local => "local",
            Tier::Distributed => "distributed",
            Tier::Durable => "durable",
        };
        f.write_str(name)
    }
}

/// Outcome of a delete against a cache or store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The key was present and has been removed.
    Removed,
    /// The key was already absent.
    NotFound,
}

/// Check that a key can be admitted by the write path.
pub fn validate_key(key: &str) -> Result<(), ValidationError> {
    if key.trim().is_empty() {
        return Err(ValidationError::EmptyKey);
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(ValidationError::KeyTooLong {
            len: key.len(),
            max: MAX_KEY_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_validate_key_rejects_blank() {
        assert_eq!(validate_key(""), Err(ValidationError::EmptyKey));
        assert_eq!(validate_key("   "), Err(ValidationError::EmptyKey));
    }

    #[test]
    fn test_validate_key_rejects_oversized() {
        let key = "k".repeat(MAX_KEY_BYTES + 1);
        assert_eq!(
            validate_key(&key),
            Err(ValidationError::KeyTooLong {
                len: MAX_KEY_BYTES + 1,
                max: MAX_KEY_BYTES,
            })
        );
        assert!(validate_key(&"k".repeat(MAX_KEY_BYTES)).is_ok());
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(Tier::Local.to_string(), "local");
        assert_eq!(Tier::Distributed.to_string(), "distributed");
        assert_eq!(Tier::Durable.to_string(), "durable");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any non-blank key within the byte limit is admissible.
        #[test]
        fn prop_bounded_nonblank_keys_are_valid(key in "[a-zA-Z0-9_.:-]{1,64}") {
            prop_assert!(validate_key(&key).is_ok());
        }
    }

    #[test]
    fn test_entry_serde() {
        let entry = Entry::new("oauth_client_secret", "s3cr3t");
        let json = serde_json::to_string(&entry).unwrap();
        let back: Entry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }
}
