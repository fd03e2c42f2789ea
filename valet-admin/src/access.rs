//! Who is calling, and whether they may administer values.

use serde::{Deserialize, Serialize};
use valet_core::{AccessError, ValetResult};

/// The caller of an administrative operation.
///
/// Identity comes from whatever sign-in mechanism fronts the admin surface;
/// this crate only consumes the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// No signed-in user.
    Anonymous,
    /// A signed-in user.
    User { email: String, is_admin: bool },
}

impl Principal {
    /// A signed-in administrator.
    pub fn admin(email: impl Into<String>) -> Self {
        Principal::User {
            email: email.into(),
            is_admin: true,
        }
    }

    /// A signed-in user without admin rights.
    pub fn user(email: impl Into<String>) -> Self {
        Principal::User {
            email: email.into(),
            is_admin: false,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Principal::User { is_admin: true, .. })
    }

    /// Identifier for logs.
    pub fn display_name(&self) -> &str {
        match self {
            Principal::Anonymous => "anonymous",
            Principal::User { email, .. } => email,
        }
    }
}

/// Allow only administrators through.
///
/// Anonymous callers are told where to sign in; signed-in non-admins are
/// refused outright.
pub fn authorize(principal: &Principal, login_path: &str) -> ValetResult<()> {
    match principal {
        Principal::User { is_admin: true, .. } => Ok(()),
        Principal::User { email, .. } => {
            tracing::warn!(principal = %email, "Non-admin attempted value administration");
            Err(AccessError::Forbidden {
                principal: email.clone(),
            }
            .into())
        }
        Principal::Anonymous => Err(AccessError::Unauthenticated {
            login_path: login_path.to_string(),
        }
        .into()),
    }
}
