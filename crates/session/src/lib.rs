//! Session management for the gardener portal.
//!
//! This crate owns the client-side view of who is signed in and what they
//! may do, and keeps it in step with the portal's authentication API.
//!
//! # Overview
//!
//! - **Session**: the current user, their permissions, and whether the
//!   backend has been asked yet.
//! - **AuthBackend**: a trait over the auth API; [`HttpAuthBackend`] speaks
//!   to the real one.
//! - **SessionStore**: runs session checks, sign-in, registration and
//!   sign-out, and publishes every change to subscribers.
//! - **Forms**: local validation of the sign-in and registration forms.
//!
//! # Example
//!
//! ```no_run
//! use session::{HttpAuthBackend, LoginForm, SessionStore};
//!
//! # async fn example() -> session::Result<()> {
//! let backend = HttpAuthBackend::builder("https://portal.example.org/api").build()?;
//! let store = SessionStore::new(backend);
//!
//! store.check_session().await?;
//! if !store.snapshot().is_authenticated() {
//!     store
//!         .submit_login(LoginForm::new("anna@example.com", "secret1"))
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

mod backend;
mod error;
mod forms;
mod state;
mod store;

pub use backend::{
    AuthBackend, Credentials, DEFAULT_FAILURE_MESSAGE, HttpAuthBackend, HttpAuthBackendBuilder,
    Registration, SessionPayload,
};
pub use error::{Error, Result};
pub use forms::{FieldError, FormErrors, LoginForm, RegisterForm};
pub use state::{Session, SessionStatus, UserIdentity};
pub use store::SessionStore;
