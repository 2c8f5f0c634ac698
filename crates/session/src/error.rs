use crate::forms::FormErrors;
use thiserror::Error;

/// Session and authentication errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Credentials were rejected. The message is safe to show to the user.
    #[error("{0}")]
    Authentication(String),

    /// No valid session exists for an operation that needs one.
    #[error("session expired")]
    SessionExpired,

    /// The session is valid but lacks a required permission.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The auth backend could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The auth backend answered with something unexpected.
    #[error("API error: {0}")]
    Api(String),

    /// A form failed validation before anything was sent.
    #[error("invalid form: {0}")]
    Validation(FormErrors),
}

impl Error {
    /// Whether the error should be shown inline next to the auth form.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::Authentication(_) | Error::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
