//! Client-side session state.

use crate::backend::SessionPayload;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use permissions::{Decision, PermissionCode, PermissionSet, Requirement};
use serde::{Deserialize, Serialize};

static NO_PERMISSIONS: PermissionSet = PermissionSet::new();

/// The signed-in member as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// Where the session is in its bootstrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// Nothing has asked the backend yet.
    #[default]
    Uninitialized,
    /// A session check is in flight.
    Loading,
    /// The backend has answered at least once.
    Ready,
}

/// Current authentication and permission state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<UserIdentity>,
    pub permissions: PermissionSet,
    pub status: SessionStatus,
    /// When the backend last confirmed this state.
    pub checked_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A settled session with nobody signed in.
    pub fn anonymous() -> Self {
        Self {
            status: SessionStatus::Ready,
            checked_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// A settled session for `user` holding `permissions`.
    pub fn authenticated(user: UserIdentity, permissions: PermissionSet) -> Self {
        Self {
            user: Some(user),
            permissions,
            status: SessionStatus::Ready,
            checked_at: Some(Utc::now()),
        }
    }

    pub(crate) fn from_payload(payload: SessionPayload) -> Self {
        Self::authenticated(payload.user, payload.permissions)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.status == SessionStatus::Ready
    }

    /// Permissions that actually count: none at all without a user.
    pub fn effective_permissions(&self) -> &PermissionSet {
        if self.user.is_some() {
            &self.permissions
        } else {
            &NO_PERMISSIONS
        }
    }

    pub fn has_permission(&self, required: &[PermissionCode]) -> bool {
        permissions::has_permission(self.effective_permissions(), required)
    }

    pub fn has_any_permission(&self, required: &[PermissionCode]) -> bool {
        permissions::has_any_permission(self.effective_permissions(), required)
    }

    /// Demand a requirement, failing with the matching error kind.
    pub fn require(&self, requirement: &Requirement) -> Result<()> {
        if self.user.is_none() {
            return Err(Error::SessionExpired);
        }
        match requirement.check(self.effective_permissions()) {
            Decision::Allow => Ok(()),
            denied @ Decision::Deny { .. } => Err(Error::PermissionDenied(denied.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> UserIdentity {
        UserIdentity {
            id: "17".into(),
            email: "anna@example.com".into(),
            name: "Anna".into(),
            role: "member".into(),
        }
    }

    #[test]
    fn test_no_user_means_no_permissions() {
        let session = Session {
            permissions: [PermissionCode::VIEW_DASHBOARD].into_iter().collect(),
            status: SessionStatus::Ready,
            ..Session::default()
        };
        assert!(session.effective_permissions().is_empty());
        assert!(!session.has_permission(&[PermissionCode::VIEW_DASHBOARD]));
    }

    #[test]
    fn test_require() {
        let session = Session::authenticated(
            member(),
            [PermissionCode::VIEW_DASHBOARD].into_iter().collect(),
        );
        assert!(
            session
                .require(&Requirement::all_of([PermissionCode::VIEW_DASHBOARD]))
                .is_ok()
        );
        assert!(matches!(
            session.require(&Requirement::all_of([PermissionCode::VIEW_FORUM])),
            Err(Error::PermissionDenied(_))
        ));
        assert!(matches!(
            Session::anonymous().require(&Requirement::None),
            Err(Error::SessionExpired)
        ));
    }

    #[test]
    fn test_default_is_uninitialized() {
        let session = Session::default();
        assert_eq!(session.status, SessionStatus::Uninitialized);
        assert!(!session.is_ready());
        assert!(!session.is_authenticated());
    }
}
