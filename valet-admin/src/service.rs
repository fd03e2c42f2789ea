//! Administrative operations over a resolver.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;
use valet_core::{validate_key, ValetConfig, ValetResult};
use valet_storage::{DistributedCache, DurableStore, LocalCache, ValueResolver};

use crate::access::{authorize, Principal};

/// A submitted admin form.
///
/// A non-empty `delete_key` makes this a delete; otherwise it adds
/// `key` = `val`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub val: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_key: Option<String>,
}

impl AdminRequest {
    pub fn add(key: impl Into<String>, val: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            val: val.into(),
            delete_key: None,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            delete_key: Some(key.into()),
            ..Self::default()
        }
    }

    /// The operation this form asks for.
    pub fn action(&self) -> AdminAction<'_> {
        match self.delete_key.as_deref() {
            Some(key) if !key.is_empty() => AdminAction::Delete { key },
            _ => AdminAction::Add {
                key: &self.key,
                value: &self.val,
            },
        }
    }
}

/// What an [`AdminRequest`] does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction<'a> {
    Add { key: &'a str, value: &'a str },
    Delete { key: &'a str },
}

/// Admin surface: list, add, and delete values.
///
/// Every operation checks the caller before touching any tier.
pub struct AdminService<L, C, S>
where
    L: LocalCache,
    C: DistributedCache,
    S: DurableStore,
{
    resolver: ValueResolver<L, C, S>,
    admin_path: String,
}

impl<L, C, S> AdminService<L, C, S>
where
    L: LocalCache,
    C: DistributedCache,
    S: DurableStore,
{
    pub fn new(resolver: ValueResolver<L, C, S>, admin_path: impl Into<String>) -> Self {
        Self {
            resolver,
            admin_path: admin_path.into(),
        }
    }

    pub fn from_config(resolver: ValueResolver<L, C, S>, config: &ValetConfig) -> Self {
        Self::new(resolver, config.admin_path.clone())
    }

    pub fn resolver(&self) -> &ValueResolver<L, C, S> {
        &self.resolver
    }

    /// Path anonymous callers are sent to sign in at.
    pub fn admin_path(&self) -> &str {
        &self.admin_path
    }

    /// Every stored value, sorted by key.
    pub async fn list_all(&self, principal: &Principal) -> ValetResult<BTreeMap<String, String>> {
        authorize(principal, &self.admin_path)?;
        let entries = self.resolver.list_all().await?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect())
    }

    /// Set a value. Fails if the key is already set.
    pub async fn set(&self, principal: &Principal, key: &str, value: &str) -> ValetResult<()> {
        authorize(principal, &self.admin_path)?;
        self.resolver.set(key, value).await?;
        info!(principal = %principal.display_name(), key = %key, "Admin added value");
        Ok(())
    }

    /// Delete a value. Deleting an unset key succeeds.
    pub async fn delete(&self, principal: &Principal, key: &str) -> ValetResult<()> {
        authorize(principal, &self.admin_path)?;
        validate_key(key)?;
        self.resolver.delete(key).await?;
        info!(principal = %principal.display_name(), key = %key, "Admin deleted value");
        Ok(())
    }

    /// Dispatch a submitted form.
    pub async fn apply(&self, principal: &Principal, request: &AdminRequest) -> ValetResult<()> {
        match request.action() {
            AdminAction::Delete { key } => self.delete(principal, key).await,
            AdminAction::Add { key, value } => self.set(principal, key, value).await,
        }
    }
}
