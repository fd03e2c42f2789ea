//! In-memory process-local cache.

use std::collections::HashMap;
use std::sync::RwLock;

use super::traits::LocalCache;

/// Process-local cache backed by a `HashMap`.
///
/// Entries never expire. The resolver only removes entries that it deletes
/// itself, so another process deleting a key leaves this cache serving the
/// old value until restart.
#[derive(Debug, Default)]
pub struct MemoryLocalCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryLocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached key.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl LocalCache for MemoryLocalCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) -> bool {
        self.entries
            .write()
            .map(|mut entries| entries.remove(key).is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let cache = MemoryLocalCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get("k"), None);

        cache.put("k", "v");
        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_overwrites() {
        let cache = MemoryLocalCache::new();
        cache.put("k", "v1");
        cache.put("k", "v1");
        assert_eq!(cache.len(), 1);
        cache.put("k", "v2");
        assert_eq!(cache.get("k"), Some("v2".to_string()));
    }

    #[test]
    fn test_remove() {
        let cache = MemoryLocalCache::new();
        cache.put("k", "v");
        assert!(cache.remove("k"));
        assert!(!cache.remove("k"));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_clear() {
        let cache = MemoryLocalCache::new();
        cache.put("a", "1");
        cache.put("b", "2");
        cache.clear();
        assert!(cache.is_empty());
    }
}
