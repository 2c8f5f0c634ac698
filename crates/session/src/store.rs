//! Session store.

use crate::backend::{AuthBackend, Credentials, Registration};
use crate::forms::{LoginForm, RegisterForm};
use crate::{Error, Result, Session, SessionStatus, UserIdentity};
use permissions::Requirement;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Owns the client-side session and keeps it in step with the backend.
///
/// Every operation takes a ticket when it starts. A finished backend call
/// only writes the session if no newer operation has written since, so the
/// state reflects the most recently issued request that produced one.
/// Operations that fail without writing never supersede older ones.
pub struct SessionStore<B> {
    backend: B,
    state: watch::Sender<Session>,
    issued: AtomicU64,
    written: AtomicU64,
    checks_in_flight: AtomicUsize,
}

impl<B: AuthBackend> SessionStore<B> {
    /// Create a store with an uninitialized session.
    pub fn new(backend: B) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            backend,
            state,
            issued: AtomicU64::new(0),
            written: AtomicU64::new(0),
            checks_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// A copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Watch the session; the receiver is notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Demand `requirement` of the current session.
    pub fn require(&self, requirement: &Requirement) -> Result<()> {
        self.state.borrow().require(requirement)
    }

    /// Ask the backend who is signed in.
    ///
    /// A missing session and an unreachable backend both leave the store
    /// anonymous and `Ready`; the latter also returns the network error.
    pub async fn check_session(&self) -> Result<()> {
        let ticket = self.begin();
        let _check = CheckInFlight::enter(&self.state, &self.checks_in_flight);

        let result = self.backend.current_session().await;

        let (next, outcome) = match result {
            Ok(Some(payload)) => {
                debug!(user = %payload.user.email, "session restored");
                (Session::from_payload(payload), Ok(()))
            }
            Ok(None) => {
                debug!("no active session");
                (Session::anonymous(), Ok(()))
            }
            Err(e) => {
                warn!(error = %e, "session check failed");
                (Session::anonymous(), Err(e))
            }
        };

        self.apply(ticket, next);
        outcome
    }

    /// Sign in with an email and password.
    ///
    /// On failure the session is left exactly as it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserIdentity> {
        self.login_with(Credentials::new(email, password)).await
    }

    /// Validate the login form, then sign in. Invalid forms never reach the
    /// backend.
    pub async fn submit_login(&self, form: LoginForm) -> Result<UserIdentity> {
        let credentials = form.into_credentials().map_err(Error::Validation)?;
        self.login_with(credentials).await
    }

    /// Create an account, then sign it in.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<UserIdentity> {
        self.register_with(Registration::new(email, password, name))
            .await
    }

    /// Validate the registration form, then register. Invalid forms never
    /// reach the backend.
    pub async fn submit_register(&self, form: RegisterForm) -> Result<UserIdentity> {
        let registration = form.into_registration().map_err(Error::Validation)?;
        self.register_with(registration).await
    }

    /// Sign out.
    ///
    /// The local session is cleared before the backend is told, and stays
    /// cleared even if that call fails.
    pub async fn logout(&self) -> Result<()> {
        let ticket = self.begin();
        self.apply(ticket, Session::anonymous());
        info!("signed out");

        self.backend.logout().await.inspect_err(|e| {
            warn!(error = %e, "backend logout failed");
        })
    }

    /// Drop the session after the backend reported it expired.
    pub fn expire(&self) {
        let ticket = self.begin();
        if self.apply(ticket, Session::anonymous()) {
            info!("session expired");
        }
    }

    async fn login_with(&self, credentials: Credentials) -> Result<UserIdentity> {
        let ticket = self.begin();
        match self.backend.login(&credentials).await {
            Ok(payload) => {
                let user = payload.user.clone();
                info!(user = %user.email, permissions = %payload.permissions, "signed in");
                self.apply(ticket, Session::from_payload(payload));
                Ok(user)
            }
            Err(e) => {
                warn!(email = %credentials.email, error = %e, "sign-in failed");
                Err(e)
            }
        }
    }

    async fn register_with(&self, registration: Registration) -> Result<UserIdentity> {
        let ticket = self.begin();
        match self.backend.register(&registration).await {
            Ok(payload) => {
                let user = payload.user.clone();
                info!(user = %user.email, "registered");
                self.apply(ticket, Session::from_payload(payload));
                Ok(user)
            }
            Err(e) => {
                warn!(email = %registration.email, error = %e, "registration failed");
                Err(e)
            }
        }
    }

    fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish `next` unless an operation issued after `ticket` has already
    /// written. Returns whether it was published.
    fn apply(&self, ticket: u64, next: Session) -> bool {
        let applied = self.state.send_if_modified(|session| {
            if self.written.load(Ordering::SeqCst) > ticket {
                return false;
            }
            self.written.store(ticket, Ordering::SeqCst);
            *session = next;
            true
        });
        if !applied {
            debug!(ticket, "discarding stale session result");
        }
        applied
    }
}

/// Marks a session check as running for as long as it is alive, including
/// when the check future is dropped before the backend answers.
struct CheckInFlight<'a> {
    state: &'a watch::Sender<Session>,
    count: &'a AtomicUsize,
}

impl<'a> CheckInFlight<'a> {
    fn enter(state: &'a watch::Sender<Session>, count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        state.send_if_modified(|session| {
            if session.status == SessionStatus::Loading {
                return false;
            }
            session.status = SessionStatus::Loading;
            true
        });
        Self { state, count }
    }
}

impl Drop for CheckInFlight<'_> {
    /// The last check to finish must not leave the session in `Loading`,
    /// whether or not its own result was published.
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
        self.state.send_if_modified(|session| {
            if session.status != SessionStatus::Loading
                || self.count.load(Ordering::SeqCst) > 0
            {
                return false;
            }
            session.status = if session.checked_at.is_some() {
                SessionStatus::Ready
            } else {
                SessionStatus::Uninitialized
            };
            debug!(status = ?session.status, "session check abandoned");
            true
        });
    }
}
