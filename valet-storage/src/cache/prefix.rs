//! Key prefixing for the distributed cache.
//!
//! Several applications may share one cache. Each stores its keys under its
//! own prefix, so the cache-level key is `prefix + key`.

/// A cache key prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPrefix {
    prefix: String,
}

impl KeyPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The raw prefix string.
    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Encode a caller key into its cache-level form.
    pub fn encode(&self, key: &str) -> String {
        let mut encoded = String::with_capacity(self.prefix.len() + key.len());
        encoded.push_str(&self.prefix);
        encoded.push_str(key);
        encoded
    }
}
