//! History and redirect following.

use crate::guard::{self, Outcome, Redirect};
use crate::route::{ROOT_PATH, normalize};
use crate::{Error, Page, Result, RouteTree};
use session::Session;
use tracing::{debug, info};

/// Guards may bounce a navigation at most this many times.
pub const MAX_REDIRECTS: usize = 8;

/// One history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    /// Where the user was headed before being sent to sign in.
    pub from: Option<String>,
}

/// What a navigation settled on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Page(Page),
    Loading,
}

/// The result of a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The path finally shown.
    pub path: String,
    pub view: View,
    /// Redirects taken on the way, in order.
    pub redirects: Vec<Redirect>,
}

/// A history stack that follows guard redirects.
///
/// Navigations push; redirects replace the entry they were taken from.
pub struct Navigator {
    tree: RouteTree,
    base_path: String,
    history: Vec<Entry>,
}

impl Navigator {
    pub fn new(tree: RouteTree) -> Self {
        Self {
            tree,
            base_path: String::new(),
            history: Vec::new(),
        }
    }

    /// Mount the portal under a path prefix such as `/portal`.
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        let base = normalize(base_path);
        self.base_path = if base == ROOT_PATH { String::new() } else { base };
        self
    }

    pub fn tree(&self) -> &RouteTree {
        &self.tree
    }

    pub fn current(&self) -> Option<&Entry> {
        self.history.last()
    }

    pub fn history(&self) -> &[Entry] {
        &self.history
    }

    /// The full URL path for an in-app path.
    pub fn href(&self, path: &str) -> String {
        let path = normalize(path);
        if path == ROOT_PATH && !self.base_path.is_empty() {
            return self.base_path.clone();
        }
        format!("{}{}", self.base_path, path)
    }

    /// Where to go after a successful sign-in: the stored destination, or
    /// the root.
    pub fn return_path(&self) -> String {
        self.current()
            .and_then(|entry| entry.from.clone())
            .unwrap_or_else(|| ROOT_PATH.to_string())
    }

    /// Push `path` and resolve it.
    pub fn navigate(&mut self, path: &str, session: &Session) -> Result<Resolution> {
        let path = self.strip_base(path);
        info!(%path, "navigate");
        self.history.push(Entry { path, from: None });
        self.settle(session)
    }

    /// Replace the current entry with `path` and resolve it.
    pub fn replace(&mut self, path: &str, session: &Session) -> Result<Resolution> {
        let path = self.strip_base(path);
        self.history.pop();
        self.history.push(Entry { path, from: None });
        self.settle(session)
    }

    /// Re-run the guards for the current entry, e.g. after the session
    /// changed. Resolves the root when history is empty.
    pub fn refresh(&mut self, session: &Session) -> Result<Resolution> {
        if self.history.is_empty() {
            return self.navigate(ROOT_PATH, session);
        }
        self.settle(session)
    }

    /// Drop the current entry and resolve the one before it. Returns `None`
    /// when there is nowhere to go back to.
    pub fn back(&mut self, session: &Session) -> Option<Result<Resolution>> {
        if self.history.len() < 2 {
            return None;
        }
        self.history.pop();
        Some(self.settle(session))
    }

    fn strip_base(&self, path: &str) -> String {
        let path = normalize(path);
        if self.base_path.is_empty() {
            return path;
        }
        match path.strip_prefix(&self.base_path) {
            Some("") => ROOT_PATH.to_string(),
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            _ => path,
        }
    }

    /// Evaluate the top entry, following redirects by replacing it.
    fn settle(&mut self, session: &Session) -> Result<Resolution> {
        let mut redirects = Vec::new();
        let mut visited = Vec::new();

        loop {
            let Some(entry) = self.history.last_mut() else {
                return Err(Error::InvalidRoute {
                    path: String::new(),
                    reason: "empty history".into(),
                });
            };
            visited.push(entry.path.clone());

            let outcome = match self.tree.resolve(&entry.path) {
                Some(matched) => guard::evaluate(&matched, session, &entry.path),
                None => Outcome::Render(Page::NotFound),
            };

            match outcome {
                Outcome::Render(page) => {
                    debug!(path = %entry.path, %page, "render");
                    return Ok(Resolution {
                        path: entry.path.clone(),
                        view: View::Page(page),
                        redirects,
                    });
                }
                Outcome::Pending => {
                    debug!(path = %entry.path, "waiting for session");
                    return Ok(Resolution {
                        path: entry.path.clone(),
                        view: View::Loading,
                        redirects,
                    });
                }
                Outcome::Redirect(redirect) => {
                    if redirects.len() >= MAX_REDIRECTS {
                        return Err(Error::RedirectLoop(visited));
                    }
                    info!(from = %entry.path, to = redirect.to, reason = ?redirect.reason, "redirect");
                    // Keep the first destination if sign-in bounces us again.
                    let from = redirect.from.clone().or_else(|| entry.from.take());
                    *entry = Entry {
                        path: redirect.to.to_string(),
                        from,
                    };
                    redirects.push(redirect);
                }
            }
        }
    }
}
