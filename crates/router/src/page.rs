//! Views the portal can show.

use std::fmt;

/// A page a route can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Login,
    Register,
    /// Shell around the member pages.
    Dashboard,
    Profile,
    Payments,
    Voting,
    Forum,
    Meters,
    Calendar,
    NotAuthorized,
    NotFound,
}

impl Page {
    pub fn title(self) -> &'static str {
        match self {
            Page::Login => "Sign in",
            Page::Register => "Register",
            Page::Dashboard => "Dashboard",
            Page::Profile => "Profile",
            Page::Payments => "Payments",
            Page::Voting => "Voting",
            Page::Forum => "Forum",
            Page::Meters => "Meter readings",
            Page::Calendar => "Calendar",
            Page::NotAuthorized => "Access denied",
            Page::NotFound => "Page not found",
        }
    }

    /// The error view this page stands for, if it is an error page.
    pub fn error_view(self) -> Option<ErrorView> {
        match self {
            Page::NotAuthorized => Some(ErrorView::for_status(403)),
            Page::NotFound => Some(ErrorView::for_status(404)),
            _ => None,
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Terminal view shown for routing and rendering failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorView {
    pub status: u16,
    pub title: &'static str,
    pub subtitle: &'static str,
}

impl ErrorView {
    /// Map a status to its view. Unknown statuses become the generic 500.
    pub fn for_status(status: u16) -> Self {
        match status {
            404 => Self {
                status,
                title: "Page not found",
                subtitle: "The page you asked for does not exist or has moved.",
            },
            403 => Self {
                status,
                title: "Access denied",
                subtitle: "You do not have permission to view this page.",
            },
            401 => Self {
                status,
                title: "Sign-in required",
                subtitle: "Sign in to view this page.",
            },
            _ => Self::internal(),
        }
    }

    /// The catch-all failure view.
    pub fn internal() -> Self {
        Self {
            status: 500,
            title: "Something went wrong",
            subtitle: "Please try again later.",
        }
    }

    /// Whether the view should offer a way to sign in.
    pub fn offers_sign_in(&self) -> bool {
        self.status == 401
    }
}

impl fmt::Display for ErrorView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status, self.title, self.subtitle)
    }
}
