//! VALET Admin - Administrative surface for stored values
//!
//! Lists, adds, and deletes values on behalf of a signed-in administrator.
//! Rendering and transport are left to the embedding application; this crate
//! decides who may act and what each submitted form does.

pub mod access;
pub mod error;
pub mod service;

pub use access::{authorize, Principal};
pub use error::{AdminError, AdminErrorCode, AdminResult};
pub use service::{AdminAction, AdminRequest, AdminService};
