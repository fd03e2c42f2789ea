//! Valet Core - Entry Types, Errors, and Configuration
//!
//! Pure data structures shared by every Valet crate. Tier orchestration
//! lives in valet-storage; the administrative façade in valet-admin.

pub mod config;
pub mod entry;
pub mod error;

pub use config::ValetConfig;
pub use entry::{validate_key, Entry, Removal, Tier, BACKEND_MAX_KEY_BYTES, MAX_KEY_BYTES};
pub use error::{AccessError, ConfigError, StoreError, ValetError, ValetResult, ValidationError};
