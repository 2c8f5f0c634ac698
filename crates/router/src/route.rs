//! Route declarations and path matching.

use crate::{Error, Page, Result};
use permissions::{PermissionCode, Requirement};
use std::fmt;

pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const NOT_AUTHORIZED_PATH: &str = "/not-authorized";

const WILDCARD: &str = "*";

/// Which guard wraps a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    /// Anyone may see it.
    Public,
    /// Only visitors without a session, e.g. the sign-in page.
    AuthOnly,
    /// A signed-in user holding the route's requirement.
    RequiresPermissions,
}

/// A static route declaration.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    path: String,
    guard: GuardKind,
    requirement: Requirement,
    page: Page,
    index: bool,
    children: Vec<RouteSpec>,
}

impl RouteSpec {
    fn new(path: &str, guard: GuardKind, requirement: Requirement, page: Page) -> Self {
        Self {
            path: path.to_string(),
            guard,
            requirement,
            page,
            index: false,
            children: Vec::new(),
        }
    }

    pub fn public(path: &str, page: Page) -> Self {
        Self::new(path, GuardKind::Public, Requirement::None, page)
    }

    pub fn auth_only(path: &str, page: Page) -> Self {
        Self::new(path, GuardKind::AuthOnly, Requirement::None, page)
    }

    pub fn protected(path: &str, page: Page, requirement: Requirement) -> Self {
        Self::new(path, GuardKind::RequiresPermissions, requirement, page)
    }

    /// The child rendered at the parent's own path.
    pub fn index(page: Page, requirement: Requirement) -> Self {
        Self {
            index: true,
            ..Self::new("", GuardKind::RequiresPermissions, requirement, page)
        }
    }

    /// Matches any path nothing else claimed.
    pub fn catch_all(page: Page) -> Self {
        Self::public(WILDCARD, page)
    }

    pub fn with_children(mut self, children: Vec<RouteSpec>) -> Self {
        self.children = children;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn guard(&self) -> GuardKind {
        self.guard
    }

    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn is_index(&self) -> bool {
        self.index
    }

    pub fn children(&self) -> &[RouteSpec] {
        &self.children
    }

    fn is_catch_all(&self) -> bool {
        self.path == WILDCARD
    }

    fn segments(&self) -> Vec<&str> {
        split(&self.path)
    }

    fn validate(&self, parent: &str) -> Result<()> {
        let full = join(parent, &self.path);
        if self.path.is_empty() && !self.index {
            return Err(Error::InvalidRoute {
                path: full,
                reason: "only index routes may have an empty path".into(),
            });
        }
        if self.guard == GuardKind::RequiresPermissions {
            self.requirement.ensure_non_empty(&full)?;
        }
        if self.index && !self.children.is_empty() {
            return Err(Error::InvalidRoute {
                path: full,
                reason: "index routes cannot have children".into(),
            });
        }
        for child in &self.children {
            child.validate(&full)?;
        }
        Ok(())
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let label = if self.index { "(index)" } else { self.path.as_str() };
        let guard = match self.guard {
            GuardKind::Public => "public".to_string(),
            GuardKind::AuthOnly => "signed-out only".to_string(),
            GuardKind::RequiresPermissions => self.requirement.to_string(),
        };
        let indent = "  ".repeat(depth);
        writeln!(
            f,
            "{indent}{label:<width$}  {:<16}  {guard}",
            self.page.title(),
            width = 18usize.saturating_sub(indent.len())
        )?;
        for child in &self.children {
            child.fmt_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

/// The routes matched by a path, outermost first.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub chain: Vec<&'a RouteSpec>,
}

impl RouteMatch<'_> {
    /// The page of the innermost matched route.
    pub fn page(&self) -> Page {
        self.chain
            .last()
            .map(|route| route.page())
            .unwrap_or(Page::NotFound)
    }
}

/// The immutable set of routes, built once at startup.
#[derive(Debug, Clone)]
pub struct RouteTree {
    routes: Vec<RouteSpec>,
}

impl RouteTree {
    /// Build a tree, rejecting malformed declarations.
    pub fn new(routes: Vec<RouteSpec>) -> Result<Self> {
        for route in &routes {
            route.validate("")?;
        }
        Ok(Self { routes })
    }

    /// The member portal's routes.
    pub fn portal() -> Self {
        use PermissionCode as P;

        let routes = vec![
            RouteSpec::auth_only(LOGIN_PATH, Page::Login),
            RouteSpec::auth_only(REGISTER_PATH, Page::Register),
            RouteSpec::protected(
                ROOT_PATH,
                Page::Dashboard,
                Requirement::all_of([P::VIEW_DASHBOARD]),
            )
            .with_children(vec![
                RouteSpec::index(Page::Profile, Requirement::all_of([P::VIEW_PROFILE])),
                RouteSpec::protected(
                    "payments",
                    Page::Payments,
                    Requirement::any_of([P::VIEW_PAYMENTS, P::MAKE_PAYMENTS]),
                ),
                RouteSpec::protected(
                    "voting",
                    Page::Voting,
                    Requirement::all_of([P::PARTICIPATE_VOTING]),
                ),
                RouteSpec::protected("forum", Page::Forum, Requirement::all_of([P::VIEW_FORUM])),
                RouteSpec::protected(
                    "meters",
                    Page::Meters,
                    Requirement::all_of([P::SUBMIT_METER_READINGS]),
                ),
                RouteSpec::protected(
                    "calendar",
                    Page::Calendar,
                    Requirement::all_of([P::VIEW_CALENDAR]),
                ),
            ]),
            RouteSpec::public(NOT_AUTHORIZED_PATH, Page::NotAuthorized),
            RouteSpec::catch_all(Page::NotFound),
        ];

        Self { routes }
    }

    pub fn routes(&self) -> &[RouteSpec] {
        &self.routes
    }

    /// Match a path against the tree.
    ///
    /// Query strings, fragments and trailing slashes are ignored. Segments
    /// match exactly and case-sensitively. Returns `None` only when no
    /// catch-all route is declared.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        let segments = split(strip_suffixes(path));

        for route in self.routes.iter().filter(|r| !r.is_catch_all()) {
            if let Some(chain) = match_route(route, &segments) {
                return Some(RouteMatch { chain });
            }
        }

        self.routes
            .iter()
            .find(|r| r.is_catch_all())
            .map(|route| RouteMatch { chain: vec![route] })
    }
}

impl fmt::Display for RouteTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for route in &self.routes {
            route.fmt_tree(f, 0)?;
        }
        Ok(())
    }
}

fn match_route<'a>(route: &'a RouteSpec, segments: &[&str]) -> Option<Vec<&'a RouteSpec>> {
    let own = route.segments();
    if segments.len() < own.len() || segments[..own.len()] != own[..] {
        return None;
    }
    let rest = &segments[own.len()..];

    if route.children.is_empty() {
        return rest.is_empty().then(|| vec![route]);
    }

    if rest.is_empty() {
        let mut chain = vec![route];
        chain.extend(route.children.iter().find(|c| c.index));
        return Some(chain);
    }

    route
        .children
        .iter()
        .filter(|c| !c.index)
        .find_map(|child| match_route(child, rest))
        .map(|inner| {
            let mut chain = vec![route];
            chain.extend(inner);
            chain
        })
}

fn strip_suffixes(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Normalize a path to `/a/b` form.
pub fn normalize(path: &str) -> String {
    let segments = split(strip_suffixes(path));
    format!("/{}", segments.join("/"))
}

fn join(parent: &str, child: &str) -> String {
    normalize(&format!("{parent}/{child}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(tree: &RouteTree, path: &str) -> Vec<Page> {
        tree.resolve(path)
            .unwrap()
            .chain
            .iter()
            .map(|r| r.page())
            .collect()
    }

    #[test]
    fn test_portal_tree_is_valid() {
        let tree = RouteTree::portal();
        assert!(RouteTree::new(tree.routes().to_vec()).is_ok());
    }

    #[test]
    fn test_resolve_nested() {
        let tree = RouteTree::portal();
        assert_eq!(pages(&tree, "/"), [Page::Dashboard, Page::Profile]);
        assert_eq!(pages(&tree, "/payments"), [Page::Dashboard, Page::Payments]);
        assert_eq!(pages(&tree, "/meters/"), [Page::Dashboard, Page::Meters]);
        assert_eq!(pages(&tree, "/calendar?month=5#today"), [Page::Dashboard, Page::Calendar]);
        assert_eq!(pages(&tree, "/login"), [Page::Login]);
        assert_eq!(pages(&tree, "/not-authorized"), [Page::NotAuthorized]);
    }

    #[test]
    fn test_unmatched_is_not_found() {
        let tree = RouteTree::portal();
        assert_eq!(pages(&tree, "/documents"), [Page::NotFound]);
        assert_eq!(pages(&tree, "/payments/42"), [Page::NotFound]);
        assert_eq!(pages(&tree, "/Payments"), [Page::NotFound]);
        assert_eq!(pages(&tree, "/login/extra"), [Page::NotFound]);
    }

    #[test]
    fn test_protected_route_needs_requirement() {
        let err = RouteTree::new(vec![RouteSpec::protected(
            "/admin",
            Page::Dashboard,
            Requirement::None,
        )])
        .unwrap_err();
        assert!(matches!(err, Error::Permissions(_)));

        let err = RouteTree::new(vec![
            RouteSpec::protected(
                "/",
                Page::Dashboard,
                Requirement::all_of([PermissionCode::VIEW_DASHBOARD]),
            )
            .with_children(vec![RouteSpec::protected(
                "forum",
                Page::Forum,
                Requirement::AnyOf(vec![]),
            )]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("/forum"));
    }

    #[test]
    fn test_no_catch_all_resolves_none() {
        let tree = RouteTree::new(vec![RouteSpec::public("/about", Page::NotFound)]).unwrap();
        assert!(tree.resolve("/elsewhere").is_none());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("payments/"), "/payments");
        assert_eq!(normalize("//forum?x=1"), "/forum");
    }

    #[test]
    fn test_deep_tree_display() {
        let mut route = RouteSpec::public("leaf", Page::NotFound);
        for depth in 0..12 {
            route = RouteSpec::public(&format!("level{depth}"), Page::NotFound)
                .with_children(vec![route]);
        }
        let shown = RouteTree::new(vec![route]).unwrap().to_string();
        assert_eq!(shown.lines().count(), 13);
        assert!(shown.lines().last().unwrap().trim_start().starts_with("leaf"));
    }

    #[test]
    fn test_tree_display_lists_every_route() {
        let shown = RouteTree::portal().to_string();
        assert_eq!(shown.lines().count(), 11);
        assert!(shown.contains("any of [VIEW_PAYMENTS, MAKE_PAYMENTS]"));
    }
}
