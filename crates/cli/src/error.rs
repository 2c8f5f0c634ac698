//! CLI error types.

use crate::config::ConfigError;
use thiserror::Error;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// `portal.toml` or an environment override is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred in the session layer.
    #[error(transparent)]
    Session(#[from] session::Error),

    /// An error occurred while routing.
    #[error(transparent)]
    Router(#[from] router::Error),

    /// A permission code given on the command line is invalid.
    #[error(transparent)]
    Permissions(#[from] permissions::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
