//! Permission codes and requirement checks for portal routes.
//!
//! Core principle: **a route states what it needs, the session states what
//! it holds, and access is a pure function of the two.**

mod code;
mod error;
mod requirement;

pub use code::{PermissionCode, PermissionSet};
pub use error::{Error, Result};
pub use requirement::{Decision, Requirement, has_any_permission, has_permission};
