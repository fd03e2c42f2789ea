//! Errors as shown to administrative callers.
//!
//! Backend failures are logged in full and reported with a generic message;
//! conflicts, validation failures, and access refusals keep their text.

use serde::{Deserialize, Serialize};
use valet_core::{AccessError, StoreError, ValetError};

/// Error categories for the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminErrorCode {
    /// Caller is not signed in.
    Unauthenticated,
    /// Caller is signed in but not an administrator.
    Forbidden,
    /// The key is already set.
    AlreadyExists,
    /// The submitted key or form is invalid.
    InvalidInput,
    /// A backend failed.
    InternalError,
}

impl AdminErrorCode {
    /// HTTP status an HTTP front end should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            AdminErrorCode::Unauthenticated => 401,
            AdminErrorCode::Forbidden => 403,
            AdminErrorCode::AlreadyExists => 409,
            AdminErrorCode::InvalidInput => 400,
            AdminErrorCode::InternalError => 500,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            AdminErrorCode::Unauthenticated => "Sign in required",
            AdminErrorCode::Forbidden => "Forbidden",
            AdminErrorCode::AlreadyExists => "Value already set",
            AdminErrorCode::InvalidInput => "Invalid input",
            AdminErrorCode::InternalError => "Internal error",
        }
    }
}

/// Structured error for administrative callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminError {
    pub code: AdminErrorCode,
    pub message: String,
    /// Where to sign in, for `Unauthenticated`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AdminError {
    pub fn new(code: AdminErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn from_code(code: AdminErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> u16 {
        self.code.status_code()
    }

    /// The sign-in path carried by an `Unauthenticated` error.
    pub fn login_path(&self) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|d| d.get("login_path"))
            .and_then(|p| p.as_str())
    }
}

impl std::fmt::Display for AdminError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for AdminError {}

impl From<ValetError> for AdminError {
    fn from(err: ValetError) -> Self {
        match err {
            ValetError::Access(AccessError::Unauthenticated { login_path }) => {
                AdminError::from_code(AdminErrorCode::Unauthenticated)
                    .with_details(serde_json::json!({ "login_path": login_path }))
            }
            ValetError::Access(AccessError::Forbidden { .. }) => {
                AdminError::from_code(AdminErrorCode::Forbidden)
            }
            ValetError::Storage(e @ StoreError::AlreadyExists { .. }) => {
                AdminError::new(AdminErrorCode::AlreadyExists, e.to_string())
            }
            ValetError::Validation(e) => AdminError::new(AdminErrorCode::InvalidInput, e.to_string()),
            other => {
                tracing::error!(error = %other, "Value administration failed");
                AdminError::from_code(AdminErrorCode::InternalError)
            }
        }
    }
}

/// Result type alias for admin operations.
pub type AdminResult<T> = Result<T, AdminError>;
