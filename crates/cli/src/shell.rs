//! Interactive portal shell.

use std::io::{self, BufRead, Write};

use router::{ErrorView, GuardKind, Navigator, Page, Resolution, RouteTree, View};
use session::{AuthBackend, LoginForm, RegisterForm, Session, SessionStore};
use tracing::{error, warn};

use crate::error::{Error, Result};

const HELP: &str = "\
Commands:
  go <path>                  open a page
  back                       go to the previous page
  login <email>              sign in (password on the next line)
  register <email> <name>    create an account (password twice)
  logout                     sign out
  refresh                    ask the backend for the session again
  whoami                     show the current session
  help                       show this help
  quit                       leave the shell";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Go(String),
    Back,
    Login { email: String },
    Register { email: String, name: String },
    Logout,
    Refresh,
    WhoAmI,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let rest: Vec<&str> = words.collect();

        let command = match (head, rest.as_slice()) {
            ("go", [path]) => Command::Go(path.to_string()),
            ("back", []) => Command::Back,
            ("login", [email]) => Command::Login {
                email: email.to_string(),
            },
            ("register", [email, name @ ..]) if !name.is_empty() => Command::Register {
                email: email.to_string(),
                name: name.join(" "),
            },
            ("logout", []) => Command::Logout,
            ("refresh", []) => Command::Refresh,
            ("whoami", []) => Command::WhoAmI,
            ("help", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            ("go" | "back" | "login" | "register" | "logout" | "refresh" | "whoami" | "help"
            | "quit" | "exit", _) => return Err(format!("wrong arguments for '{head}'")),
            _ => return Err(format!("unknown command '{head}'")),
        };
        Ok(Some(command))
    }
}

/// Show a navigation result. Anything that fails while rendering is caught
/// here and shown as the generic failure view.
pub fn show(result: router::Result<Resolution>, nav: &Navigator, session: &Session) -> String {
    let rendered = result
        .map_err(Error::from)
        .and_then(|res| render(&res, nav, session));

    match rendered {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "render failed");
            ErrorView::internal().to_string()
        }
    }
}

fn render(res: &Resolution, nav: &Navigator, session: &Session) -> Result<String> {
    let mut out = String::new();
    for redirect in &res.redirects {
        out.push_str(&format!("-> {} ({:?})\n", redirect.to, redirect.reason));
    }
    out.push_str(&format!("[{}] ", nav.href(&res.path)));

    let page = match res.view {
        View::Loading => {
            out.push_str("Loading...");
            return Ok(out);
        }
        View::Page(page) => page,
    };

    if let Some(view) = page.error_view() {
        out.push_str(&view.to_string());
        return Ok(out);
    }

    match page {
        Page::Login => out.push_str("Sign in: use 'login <email>'"),
        Page::Register => out.push_str("Register: use 'register <email> <name>'"),
        member_page => out.push_str(&render_member_page(member_page, nav.tree(), session)?),
    }
    Ok(out)
}

fn render_member_page(page: Page, tree: &RouteTree, session: &Session) -> Result<String> {
    let user = session.user.as_ref().ok_or(session::Error::SessionExpired)?;
    let mut out = format!("{page}\n  menu: {}", menu(tree, session).join(" | "));

    if page == Page::Profile {
        out.push_str(&format!(
            "\n  name: {}\n  email: {}\n  role: {}\n  permissions: {}",
            user.name, user.email, user.role, session.permissions
        ));
    } else {
        out.push_str(&format!("\n  signed in as {}", user.email));
    }
    Ok(out)
}

/// Member pages the session may open, in declaration order.
pub fn menu(tree: &RouteTree, session: &Session) -> Vec<String> {
    let held = session.effective_permissions();
    tree.routes()
        .iter()
        .filter(|shell| shell.guard() == GuardKind::RequiresPermissions)
        .filter(|shell| shell.requirement().is_satisfied_by(held))
        .flat_map(|shell| {
            shell.children().iter().filter_map(move |child| {
                if !child.requirement().is_satisfied_by(held) {
                    return None;
                }
                let path = if child.is_index() {
                    shell.path().to_string()
                } else {
                    router::normalize(&format!("{}/{}", shell.path(), child.path()))
                };
                Some(format!("{} {path}", child.page().title()))
            })
        })
        .collect()
}

fn whoami(session: &Session) -> String {
    let checked = session
        .checked_at
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    match &session.user {
        Some(user) => format!(
            "{} <{}> ({})\n  permissions: {}\n  status: {:?}, checked {checked}",
            user.name, user.email, user.role, session.permissions, session.status
        ),
        None => format!("not signed in\n  status: {:?}, checked {checked}", session.status),
    }
}

fn describe(e: &session::Error) -> String {
    match e {
        session::Error::Validation(errors) => errors
            .fields()
            .iter()
            .map(|f| format!("  {}: {}", f.field, f.message))
            .collect::<Vec<_>>()
            .join("\n"),
        other if other.is_user_facing() => format!("  {other}"),
        other => {
            warn!(error = %other, "request failed");
            format!("  {other} (try again later)")
        }
    }
}

/// Run the shell until `quit` or end of input.
pub async fn run<B: AuthBackend>(store: SessionStore<B>, mut nav: Navigator) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut changes = store.subscribe();

    if let Err(e) = store.check_session().await {
        warn!(error = %e, "could not reach the backend");
        println!("Backend unavailable, continuing signed out:\n{}", describe(&e));
    }
    changes.mark_unchanged();
    println!("{}", show(nav.navigate("/", &store.snapshot()), &nav, &store.snapshot()));
    println!("Type 'help' for commands.\n");

    loop {
        print!("> ");
        stdout.flush()?;

        let Some(line) = read_line(&mut input)? else {
            break;
        };
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        let navigated = match command {
            Command::Quit => break,
            Command::Help => {
                println!("{HELP}");
                None
            }
            Command::WhoAmI => {
                println!("{}", whoami(&store.snapshot()));
                None
            }
            Command::Go(path) => Some(nav.navigate(&path, &store.snapshot())),
            Command::Back => match nav.back(&store.snapshot()) {
                Some(result) => Some(result),
                None => {
                    println!("No earlier page.");
                    None
                }
            },
            Command::Login { email } => {
                let password = prompt(&mut input, &mut stdout, "password: ")?;
                match store.submit_login(LoginForm::new(email, password)).await {
                    Ok(user) => {
                        println!("Welcome, {}.", user.name);
                        let target = nav.return_path();
                        Some(nav.replace(&target, &store.snapshot()))
                    }
                    Err(e) => {
                        println!("Sign-in failed:\n{}", describe(&e));
                        None
                    }
                }
            }
            Command::Register { email, name } => {
                let password = prompt(&mut input, &mut stdout, "password: ")?;
                let confirm = prompt(&mut input, &mut stdout, "confirm password: ")?;
                let form = RegisterForm::new(name, email, password, confirm);
                match store.submit_register(form).await {
                    Ok(user) => {
                        println!("Welcome, {}.", user.name);
                        let target = nav.return_path();
                        Some(nav.replace(&target, &store.snapshot()))
                    }
                    Err(e) => {
                        println!("Registration failed:\n{}", describe(&e));
                        None
                    }
                }
            }
            Command::Logout => {
                if let Err(e) = store.logout().await {
                    println!("Signed out locally; the backend did not confirm:\n{}", describe(&e));
                }
                None
            }
            Command::Refresh => {
                if let Err(e) = store.check_session().await {
                    println!("Session check failed:\n{}", describe(&e));
                }
                None
            }
        };

        // Guards re-run whenever the session moved under the current page.
        let changed = changes.has_changed().unwrap_or(false);
        changes.mark_unchanged();
        let result = match navigated {
            Some(result) => result,
            None if changed => nav.refresh(&store.snapshot()),
            None => continue,
        };
        println!("{}\n", show(result, &nav, &store.snapshot()));
    }

    println!("Goodbye.");
    Ok(())
}

fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn prompt(input: &mut impl BufRead, out: &mut impl Write, label: &str) -> Result<String> {
    write!(out, "{label}")?;
    out.flush()?;
    Ok(read_line(input)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use permissions::{PermissionCode, PermissionSet};
    use session::UserIdentity;

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

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  "), Ok(None));
        assert_eq!(Command::parse("go /forum"), Ok(Some(Command::Go("/forum".into()))));
        assert_eq!(
            Command::parse("register anna@example.com Anna Berg"),
            Ok(Some(Command::Register {
                email: "anna@example.com".into(),
                name: "Anna Berg".into()
            }))
        );
        assert_eq!(Command::parse("exit"), Ok(Some(Command::Quit)));
        assert!(Command::parse("go").is_err());
        assert!(Command::parse("register anna@example.com").is_err());
        assert!(Command::parse("dance").unwrap_err().contains("unknown"));
    }

    #[test]
    fn test_menu_follows_permissions() {
        let tree = RouteTree::portal();
        let session = member(&[
            PermissionCode::VIEW_DASHBOARD,
            PermissionCode::VIEW_PROFILE,
            PermissionCode::MAKE_PAYMENTS,
        ]);
        assert_eq!(menu(&tree, &session), ["Profile /", "Payments /payments"]);

        assert!(menu(&tree, &member(&[PermissionCode::VIEW_FORUM])).is_empty());
        assert!(menu(&tree, &Session::anonymous()).is_empty());
    }

    #[test]
    fn test_show_member_page() {
        let mut nav = Navigator::new(RouteTree::portal()).with_base_path("/portal");
        let session = member(&[PermissionCode::VIEW_DASHBOARD, PermissionCode::VIEW_PROFILE]);
        let text = show(nav.navigate("/", &session), &nav, &session);
        assert!(text.starts_with("[/portal] Profile"));
        assert!(text.contains("email: anna@example.com"));
    }

    #[test]
    fn test_show_error_views() {
        let mut nav = Navigator::new(RouteTree::portal());
        let session = Session::anonymous();
        let text = show(nav.navigate("/nowhere", &session), &nav, &session);
        assert!(text.contains("404 Page not found"));

        let text = show(nav.navigate("/forum", &session), &nav, &session);
        assert!(text.contains("-> /login"));
        assert!(text.ends_with("Sign in: use 'login <email>'"));
    }

    #[test]
    fn test_boundary_catches_failures() {
        let nav = Navigator::new(RouteTree::portal());
        let session = Session::anonymous();

        let looped = Err(router::Error::RedirectLoop(vec!["/".into(), "/".into()]));
        assert_eq!(show(looped, &nav, &session), ErrorView::internal().to_string());

        // A member page reached without a user fails to render.
        let stale = Ok(Resolution {
            path: "/forum".into(),
            view: View::Page(Page::Forum),
            redirects: Vec::new(),
        });
        assert_eq!(show(stale, &nav, &session), ErrorView::internal().to_string());
    }

    #[test]
    fn test_describe_errors() {
        let form = LoginForm::new("not-an-email", "secret1");
        let errors = form.into_credentials().unwrap_err();
        assert_eq!(
            describe(&session::Error::Validation(errors)),
            "  email: Enter a valid email address"
        );
        assert_eq!(
            describe(&session::Error::Authentication("Wrong password".into())),
            "  Wrong password"
        );
        assert!(describe(&session::Error::Network("refused".into())).ends_with("(try again later)"));
    }

    #[test]
    fn test_whoami() {
        assert!(whoami(&Session::default()).contains("checked never"));
        let text = whoami(&member(&[PermissionCode::VIEW_FORUM]));
        assert!(text.starts_with("Anna <anna@example.com> (member)"));
        assert!(text.contains("VIEW_FORUM"));
    }

    #[test]
    fn test_prompt_reads_next_line() {
        let mut input = io::Cursor::new(b"secret1\r\nnext\n".to_vec());
        let mut out = Vec::new();
        assert_eq!(prompt(&mut input, &mut out, "password: ").unwrap(), "secret1");
        assert_eq!(out, b"password: ");
        assert_eq!(read_line(&mut input).unwrap().as_deref(), Some("next"));
        assert_eq!(read_line(&mut input).unwrap(), None);
    }
}
