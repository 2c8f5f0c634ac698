mod config;
mod error;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use permissions::PermissionSet;
use router::{Navigator, RouteTree, View};
use session::{HttpAuthBackend, Session, SessionStore, UserIdentity};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use error::Result;

const CONFIG_FILE: &str = "portal.toml";
const DEFAULT_LOG_FILTER: &str = "portal=info,session=info,router=info";

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Member portal shell with session-gated routes", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the route tree and its guards
    Routes,
    /// Evaluate the guards for a path without contacting the backend
    Check {
        /// Path to open, e.g. /payments
        path: String,
        /// Permissions held by the synthetic member (repeatable, comma-separated)
        #[arg(short, long = "permission", value_name = "CODE")]
        permissions: Vec<String>,
        /// Evaluate for a visitor who is not signed in
        #[arg(long, conflicts_with = "permissions")]
        anonymous: bool,
    },
    /// Start an interactive portal session
    Shell,
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::discover(&cli.config)?;

    match cli.command {
        Some(Commands::Routes) => cmd_routes(),
        Some(Commands::Check {
            path,
            permissions,
            anonymous,
        }) => cmd_check(&config, &path, &permissions, anonymous),
        Some(Commands::Shell) | None => cmd_shell(&config).await,
    }
}

fn cmd_routes() -> Result<()> {
    print!("{}", RouteTree::portal());
    Ok(())
}

fn cmd_check(config: &Config, path: &str, codes: &[String], anonymous: bool) -> Result<()> {
    let session = if anonymous {
        Session::anonymous()
    } else {
        let mut held = PermissionSet::new();
        for list in codes {
            held.extend(PermissionSet::parse_list(list)?);
        }
        for code in held.iter().filter(|code| !code.is_known()) {
            println!("note: {code} is not a known permission");
        }
        Session::authenticated(
            UserIdentity {
                id: "check".into(),
                email: "member@localhost".into(),
                name: "Member".into(),
                role: "member".into(),
            },
            held,
        )
    };

    let mut nav = Navigator::new(RouteTree::portal()).with_base_path(&config.app.base_path);
    let resolution = nav.navigate(path, &session)?;

    for redirect in &resolution.redirects {
        let why = redirect
            .reason
            .to_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "already signed in".to_string());
        println!("redirect -> {} ({why})", nav.href(redirect.to));
    }
    match resolution.view {
        View::Page(page) => println!("render {page} at {}", nav.href(&resolution.path)),
        View::Loading => println!("pending at {}", nav.href(&resolution.path)),
    }
    Ok(())
}

async fn cmd_shell(config: &Config) -> Result<()> {
    println!("portal v{}", env!("CARGO_PKG_VERSION"));

    let backend = HttpAuthBackend::builder(&config.backend.base_url)
        .timeout(config.backend.timeout())
        .build()?;
    info!(backend = %backend, "starting shell");
    println!("Backend: {}", backend.base_url());

    let store = SessionStore::new(backend);
    let nav = Navigator::new(RouteTree::portal()).with_base_path(&config.app.base_path);
    shell::run(store, nav).await
}
