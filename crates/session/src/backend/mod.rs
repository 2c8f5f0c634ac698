//! Authentication backend abstraction.
//!
//! The session store talks to the portal's auth API through this trait so
//! the HTTP client can be swapped for an in-process fake in tests.

mod http;

pub use http::{DEFAULT_FAILURE_MESSAGE, HttpAuthBackend, HttpAuthBackendBuilder};

use crate::{Result, UserIdentity};
use permissions::PermissionSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// What the backend returns for a live session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionPayload {
    pub user: UserIdentity,
    #[serde(default)]
    pub permissions: PermissionSet,
    /// Bearer token to present on later calls, if the backend issues one.
    #[serde(default)]
    pub token: Option<String>,
}

/// Login form contents sent to the backend.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration form contents sent to the backend.
#[derive(Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Registration {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            name: name.into(),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

/// Trait for authentication backends.
pub trait AuthBackend: Send + Sync {
    /// Fetch the current session, or `None` when there is no valid one.
    fn current_session(&self) -> impl Future<Output = Result<Option<SessionPayload>>> + Send;

    /// Exchange credentials for a session.
    fn login(&self, credentials: &Credentials) -> impl Future<Output = Result<SessionPayload>> + Send;

    /// Create an account and sign it in.
    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<SessionPayload>> + Send;

    /// Invalidate the server-side session.
    fn logout(&self) -> impl Future<Output = Result<()>> + Send;
}
