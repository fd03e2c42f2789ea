//! Values registered at startup and resolved in one batch.
//!
//! Application code declares the keys it depends on, then calls
//! [`ValueRegistry::init`] once the resolver is available. Every handle is
//! filled from a single `get_multi`, so startup costs one round trip per tier
//! no matter how many values are registered.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::cache::{DistributedCache, LocalCache};
use crate::durable::DurableStore;
use crate::resolver::ValueResolver;

/// Handle to one registered value.
///
/// Reads the empty string until the owning registry has been initialized,
/// and afterwards if no tier resolved the key.
#[derive(Debug, Clone)]
pub struct RegisteredValue {
    key: Arc<str>,
    slot: Arc<RwLock<String>>,
}

impl RegisteredValue {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The resolved value.
    pub fn get(&self) -> String {
        self.slot
            .read()
            .map(|value| value.clone())
            .unwrap_or_default()
    }

    fn fill(&self, value: String) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = value;
        }
    }
}

/// Set of keys to resolve together.
#[derive(Debug, Default)]
pub struct ValueRegistry {
    handles: Vec<RegisteredValue>,
}

impl ValueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` and return its handle.
    ///
    /// Registering a key twice returns handles that share one slot.
    pub fn string(&mut self, key: impl Into<String>) -> RegisteredValue {
        let key = key.into();
        if let Some(existing) = self.handles.iter().find(|h| *h.key == *key) {
            return existing.clone();
        }

        let handle = RegisteredValue {
            key: Arc::from(key),
            slot: Arc::new(RwLock::new(String::new())),
        };
        self.handles.push(handle.clone());
        handle
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(|h| h.key())
    }

    /// Resolve every registered key and fill its handle.
    ///
    /// Can be called again to refresh handles; values still come through the
    /// resolver's tiers, so a warm local cache answers without round trips.
    pub async fn init<L, C, S>(&self, resolver: &ValueResolver<L, C, S>)
    where
        L: LocalCache,
        C: DistributedCache,
        S: DurableStore,
    {
        if self.handles.is_empty() {
            return;
        }

        let keys: Vec<&str> = self.keys().collect();
        let mut resolved: HashMap<String, String> = resolver.get_multi(keys.as_slice()).await;

        let mut unresolved = 0usize;
        for handle in &self.handles {
            let value = resolved.remove(handle.key()).unwrap_or_default();
            if value.is_empty() {
                unresolved += 1;
            }
            handle.fill(value);
        }

        if unresolved > 0 {
            warn!(
                registered = self.handles.len(),
                unresolved, "Registered values without a stored value"
            );
        } else {
            debug!(registered = self.handles.len(), "Registered values resolved");
        }
    }
}
