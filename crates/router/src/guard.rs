//! Render-or-redirect decisions.
//!
//! Guards are pure functions of the session and the matched routes. They
//! never cache: the caller re-runs them whenever the session changes.

use crate::route::{GuardKind, LOGIN_PATH, NOT_AUTHORIZED_PATH, ROOT_PATH, RouteMatch, RouteSpec};
use crate::Page;
use permissions::{Decision, PermissionCode};
use session::Session;

/// Why a guard sent the user elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectReason {
    /// Nobody is signed in.
    SignInRequired,
    /// Signed in, but without the route's permissions.
    PermissionDenied { missing: Vec<PermissionCode> },
    /// A signed-in user reached a signed-out-only page.
    AlreadySignedIn,
}

impl RedirectReason {
    /// The error kind this redirect stands in for, for callers that need
    /// to report it rather than follow it.
    pub fn to_error(&self) -> Option<session::Error> {
        match self {
            RedirectReason::SignInRequired => Some(session::Error::SessionExpired),
            RedirectReason::PermissionDenied { missing } => {
                let missing: Vec<&str> = missing.iter().map(PermissionCode::as_str).collect();
                Some(session::Error::PermissionDenied(format!(
                    "missing {}",
                    missing.join(", ")
                )))
            }
            RedirectReason::AlreadySignedIn => None,
        }
    }
}

/// A declarative redirect. Redirects always replace the current history
/// entry so denied attempts do not pile up behind the back button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: &'static str,
    /// The path the user originally asked for, kept for after sign-in.
    pub from: Option<String>,
    pub reason: RedirectReason,
}

/// What one guard decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    /// The session is still being fetched and nobody is known yet.
    Pending,
    Redirect(Redirect),
}

/// What to show for a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Render(Page),
    /// Show the loading view and re-evaluate when the session settles.
    Pending,
    Redirect(Redirect),
}

/// Run one route's guard.
///
/// For permission-guarded routes the checks run in a fixed order: no user
/// sends the visitor to sign in (carrying `requested`), a failed requirement
/// sends them to the not-authorized view, anything else passes.
pub fn check(route: &RouteSpec, session: &Session, requested: &str) -> GuardDecision {
    let pending = session.user.is_none() && !session.is_ready();

    match route.guard() {
        GuardKind::Public => GuardDecision::Pass,
        GuardKind::AuthOnly => {
            if session.is_authenticated() {
                GuardDecision::Redirect(Redirect {
                    to: ROOT_PATH,
                    from: None,
                    reason: RedirectReason::AlreadySignedIn,
                })
            } else if pending {
                GuardDecision::Pending
            } else {
                GuardDecision::Pass
            }
        }
        GuardKind::RequiresPermissions => {
            if pending {
                return GuardDecision::Pending;
            }
            if !session.is_authenticated() {
                return GuardDecision::Redirect(Redirect {
                    to: LOGIN_PATH,
                    from: Some(requested.to_string()),
                    reason: RedirectReason::SignInRequired,
                });
            }
            match route.requirement().check(session.effective_permissions()) {
                Decision::Allow => GuardDecision::Pass,
                Decision::Deny { missing } => GuardDecision::Redirect(Redirect {
                    to: NOT_AUTHORIZED_PATH,
                    from: None,
                    reason: RedirectReason::PermissionDenied { missing },
                }),
            }
        }
    }
}

/// Run every guard on the matched chain, outermost first. The first guard
/// that does not pass decides.
pub fn evaluate(matched: &RouteMatch<'_>, session: &Session, requested: &str) -> Outcome {
    for route in &matched.chain {
        match check(route, session, requested) {
            GuardDecision::Pass => continue,
            GuardDecision::Pending => return Outcome::Pending,
            GuardDecision::Redirect(redirect) => return Outcome::Redirect(redirect),
        }
    }
    Outcome::Render(matched.page())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RouteTree;
    use permissions::PermissionSet;
    use session::{SessionStatus, UserIdentity};

    fn member(codes: &[PermissionCode]) -> Session {
        Session::authenticated(
            UserIdentity {
                id: "1".into(),
                email: "anna@example.com".into(),
                name: "Anna".into(),
                role: "member".into(),
            },
            codes.iter().cloned().collect::<PermissionSet>(),
        )
    }

    fn outcome(session: &Session, path: &str) -> Outcome {
        let tree = RouteTree::portal();
        let matched = tree.resolve(path).unwrap();
        evaluate(&matched, session, path)
    }

    fn redirect_target(outcome: &Outcome) -> Option<&'static str> {
        match outcome {
            Outcome::Redirect(r) => Some(r.to),
            _ => None,
        }
    }

    #[test]
    fn no_session_redirects_to_login_with_intended_path() {
        let result = outcome(&Session::anonymous(), "/payments");
        match result {
            Outcome::Redirect(r) => {
                assert_eq!(r.to, LOGIN_PATH);
                assert_eq!(r.from.as_deref(), Some("/payments"));
                assert_eq!(r.reason, RedirectReason::SignInRequired);
            }
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn missing_permission_redirects_to_not_authorized() {
        let session = member(&[PermissionCode::VIEW_DASHBOARD, PermissionCode::VIEW_PROFILE]);
        match outcome(&session, "/voting") {
            Outcome::Redirect(r) => {
                assert_eq!(r.to, NOT_AUTHORIZED_PATH);
                assert_eq!(
                    r.reason,
                    RedirectReason::PermissionDenied {
                        missing: vec![PermissionCode::PARTICIPATE_VOTING]
                    }
                );
            }
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn any_of_payments_renders() {
        let session = member(&[PermissionCode::VIEW_DASHBOARD, PermissionCode::VIEW_PAYMENTS]);
        assert_eq!(outcome(&session, "/payments"), Outcome::Render(Page::Payments));
    }

    #[test]
    fn shell_guard_runs_before_child() {
        let session = member(&[PermissionCode::VIEW_PAYMENTS]);
        assert_eq!(redirect_target(&outcome(&session, "/payments")), Some(NOT_AUTHORIZED_PATH));
    }

    #[test]
    fn signed_in_user_cannot_reach_login() {
        let session = member(&[PermissionCode::VIEW_DASHBOARD]);
        assert_eq!(redirect_target(&outcome(&session, "/login")), Some(ROOT_PATH));
        assert_eq!(redirect_target(&outcome(&session, "/register")), Some(ROOT_PATH));
    }

    #[test]
    fn public_routes_always_render() {
        assert_eq!(
            outcome(&Session::anonymous(), "/not-authorized"),
            Outcome::Render(Page::NotAuthorized)
        );
        assert_eq!(outcome(&Session::default(), "/nowhere"), Outcome::Render(Page::NotFound));
    }

    #[test]
    fn unsettled_session_is_pending() {
        let loading = Session {
            status: SessionStatus::Loading,
            ..Session::default()
        };
        assert_eq!(outcome(&loading, "/forum"), Outcome::Pending);
        assert_eq!(outcome(&Session::default(), "/login"), Outcome::Pending);
    }

    #[test]
    fn known_user_is_judged_while_refreshing() {
        let mut session = member(&[PermissionCode::VIEW_DASHBOARD, PermissionCode::VIEW_FORUM]);
        session.status = SessionStatus::Loading;
        assert_eq!(outcome(&session, "/forum"), Outcome::Render(Page::Forum));
    }

    #[test]
    fn redirect_reasons_map_to_errors() {
        assert!(matches!(
            RedirectReason::SignInRequired.to_error(),
            Some(session::Error::SessionExpired)
        ));
        assert!(matches!(
            RedirectReason::PermissionDenied {
                missing: vec![PermissionCode::VIEW_FORUM]
            }
            .to_error(),
            Some(session::Error::PermissionDenied(m)) if m == "missing VIEW_FORUM"
        ));
        assert!(RedirectReason::AlreadySignedIn.to_error().is_none());
    }
}
