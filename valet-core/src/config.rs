//! Valet configuration.
//!
//! Loaded from environment variables with development defaults. Every field
//! has a default so an unconfigured process still resolves values against a
//! local LMDB directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::entry::{BACKEND_MAX_KEY_BYTES, MAX_KEY_BYTES};
use crate::error::ConfigError;

/// Namespace used for durable records when none is configured.
pub const DEFAULT_NAMESPACE: &str = "Values";

/// Path of the administrative page, used as the login target.
pub const DEFAULT_ADMIN_PATH: &str = "/_ah/value/admin";

/// Runtime configuration for the tiers and the admin surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValetConfig {
    /// Durable namespace (LMDB named database) holding one record per key.
    pub namespace: String,

    /// Prefix prepended to every key in the distributed cache.
    pub cache_key_prefix: String,

    /// Directory of the durable LMDB environment.
    pub durable_path: PathBuf,

    /// Map size of the durable environment in megabytes.
    pub durable_map_size_mb: usize,

    /// Directory of the host-shared cache environment.
    pub cache_path: PathBuf,

    /// Map size of the cache environment in megabytes.
    pub cache_map_size_mb: usize,

    /// Where unauthenticated admin callers are sent to sign in.
    pub admin_path: String,
}

impl Default for ValetConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            cache_key_prefix: String::new(),
            durable_path: PathBuf::from("./data/valet/durable"),
            durable_map_size_mb: 64,
            cache_path: PathBuf::from("./data/valet/cache"),
            cache_map_size_mb: 32,
            admin_path: DEFAULT_ADMIN_PATH.to_string(),
        }
    }
}

impl ValetConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create ValetConfig from environment variables.
    ///
    /// Environment variables:
    /// - `VALET_NAMESPACE`: durable namespace (default: "Values")
    /// - `VALET_CACHE_KEY_PREFIX`: distributed cache key prefix (default: "")
    /// - `VALET_DURABLE_PATH`: durable LMDB directory
    /// - `VALET_DURABLE_MAP_SIZE_MB`: durable map size (default: 64)
    /// - `VALET_CACHE_PATH`: shared cache LMDB directory
    /// - `VALET_CACHE_MAP_SIZE_MB`: cache map size (default: 32)
    /// - `VALET_ADMIN_PATH`: admin page path (default: "/_ah/value/admin")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            namespace: lookup("VALET_NAMESPACE").unwrap_or(defaults.namespace),
            cache_key_prefix: lookup("VALET_CACHE_KEY_PREFIX")
                .unwrap_or(defaults.cache_key_prefix),
            durable_path: lookup("VALET_DURABLE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.durable_path),
            durable_map_size_mb: parse_size(
                "VALET_DURABLE_MAP_SIZE_MB",
                lookup("VALET_DURABLE_MAP_SIZE_MB"),
                defaults.durable_map_size_mb,
            )?,
            cache_path: lookup("VALET_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            cache_map_size_mb: parse_size(
                "VALET_CACHE_MAP_SIZE_MB",
                lookup("VALET_CACHE_MAP_SIZE_MB"),
                defaults.cache_map_size_mb,
            )?,
            admin_path: lookup("VALET_ADMIN_PATH").unwrap_or(defaults.admin_path),
        };

        config.validate()?;
        Ok(config)
    }

    /// Set the durable namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the distributed cache key prefix.
    pub fn with_cache_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_key_prefix = prefix.into();
        self
    }

    /// Set the durable LMDB directory.
    pub fn with_durable_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.durable_path = path.into();
        self
    }

    /// Set the shared cache LMDB directory.
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Check the config for values no backend can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "namespace".to_string(),
            });
        }
        if self.durable_map_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "durable_map_size_mb".to_string(),
                value: "0".to_string(),
                reason: "map size must be positive".to_string(),
            });
        }
        if self.cache_map_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_map_size_mb".to_string(),
                value: "0".to_string(),
                reason: "map size must be positive".to_string(),
            });
        }
        if self.cache_key_prefix.len() + MAX_KEY_BYTES > BACKEND_MAX_KEY_BYTES {
            return Err(ConfigError::InvalidValue {
                field: "cache_key_prefix".to_string(),
                value: self.cache_key_prefix.clone(),
                reason: format!(
                    "prefix may be at most {} bytes",
                    BACKEND_MAX_KEY_BYTES - MAX_KEY_BYTES
                ),
            });
        }
        if !self.admin_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "admin_path".to_string(),
                value: self.admin_path.clone(),
                reason: "must be an absolute path".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_size(field: &str, raw: Option<String>, default: usize) -> Result<usize, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw,
            reason: "expected a whole number of megabytes".to_string(),
        }),
    }
}
