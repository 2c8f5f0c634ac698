//! Permission error types.

use thiserror::Error;

/// Permission errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A permission code was blank.
    #[error("invalid permission code: {0:?}")]
    InvalidCode(String),

    /// A permission-guarded route names no permissions.
    #[error("empty permission requirement for {0}")]
    EmptyRequirement(String),
}

pub type Result<T> = std::result::Result<T, Error>;
