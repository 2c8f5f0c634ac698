//! Router error types.

use thiserror::Error;

/// Router errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A route declaration is malformed.
    #[error("invalid route {path}: {reason}")]
    InvalidRoute { path: String, reason: String },

    /// Guards kept redirecting without settling on a view.
    #[error("redirect loop: {}", .0.join(" -> "))]
    RedirectLoop(Vec<String>),

    /// A route's permission requirement is invalid.
    #[error(transparent)]
    Permissions(#[from] permissions::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
