//! Route table and guards for the member portal.
//!
//! A [`RouteTree`] declares which pages exist and which guard wraps each
//! one. [`evaluate`] turns a matched route chain and the current
//! [`Session`](session::Session) into an [`Outcome`]: render a page, wait
//! for the session, or redirect. [`Navigator`] keeps history and follows
//! redirects until a view settles.
//!
//! ```
//! use router::{Navigator, Page, RouteTree, View};
//! use session::Session;
//!
//! let mut nav = Navigator::new(RouteTree::portal());
//! let res = nav.navigate("/payments", &Session::anonymous()).unwrap();
//! assert_eq!(res.view, View::Page(Page::Login));
//! assert_eq!(nav.return_path(), "/payments");
//! ```

mod error;
mod guard;
mod navigator;
mod page;
mod route;

pub use error::{Error, Result};
pub use guard::{GuardDecision, Outcome, Redirect, RedirectReason, check, evaluate};
pub use navigator::{Entry, MAX_REDIRECTS, Navigator, Resolution, View};
pub use page::{ErrorView, Page};
pub use route::{
    GuardKind, LOGIN_PATH, NOT_AUTHORIZED_PATH, REGISTER_PATH, ROOT_PATH, RouteMatch, RouteSpec,
    RouteTree, normalize,
};
