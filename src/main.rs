//! docbind - Interactive Document Shell
//!
//! This is the main entry point for the docbind shell. It starts an
//! in-memory engine and runs template lines read from stdin against it.

use docbind::shell::{Session, SessionStats};
use docbind::{Client, MemoryEngine};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Shell configuration
struct Config {
    /// Database the shell talks to
    db: String,
    /// Skip the banner and prompt
    quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db: docbind::DEFAULT_DB.to_string(),
            quiet: false,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--db" | "-d" => {
                    if i + 1 < args.len() {
                        config.db = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --db requires a value");
                        std::process::exit(1);
                    }
                }
                "--quiet" | "-q" => {
                    config.quiet = true;
                    i += 1;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("docbind version {}", docbind::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }
}

fn print_help() {
    println!(
        r#"
docbind - Parameterized Document Templates

USAGE:
    docbind [OPTIONS]

OPTIONS:
    -d, --db <NAME>      Database to use (default: test)
    -q, --quiet          No banner and no prompt
    -v, --version        Print version information
        --help           Print this help message

EXAMPLES:
    docbind                                  # Interactive shell on 'test'
    echo 'run {{ ping: 1 }}' | docbind -q     # Scripted

SHELL:
    > insert friends {{ name: #, loc: {{ lat: #, lng: # }} }} | ["Stuttgart", 48.690833, 9.140556]
    {{ "n" : 1, "ok" : 1.0 }}
    > index friends {{ loc: '2d' }}
    {{ "ok" : 1.0 }}
    > run {{ geoNear: 'friends', near: [#, #], spherical: true }} | [48.690, 9.140]
"#
    );
}

fn print_banner(config: &Config) {
    println!(
        r#"
docbind v{} - Parameterized Document Templates
──────────────────────────────────────────────────────────────
In-memory engine ready, database '{}'.
Type 'help' for commands, Ctrl+C or 'quit' to leave.
"#,
        docbind::VERSION,
        config.db
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging on stderr, RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if !config.quiet {
        print_banner(&config);
    }

    let engine = Arc::new(MemoryEngine::new());
    let client = Client::new(engine, config.db.clone());
    info!(db = %config.db, "In-memory engine initialized");

    let stats = Arc::new(SessionStats::new());
    let mut session = Session::new(
        tokio::io::stdin(),
        tokio::io::stdout(),
        client,
        Arc::clone(&stats),
    );
    if !config.quiet {
        session = session.with_prompt("> ");
    }

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, leaving shell...");
    };

    tokio::select! {
        result = session.run() => result?,
        _ = shutdown => {}
    }

    info!(
        lines = stats.lines_processed.load(Ordering::Relaxed),
        errors = stats.errors.load(Ordering::Relaxed),
        "Shell closed"
    );
    Ok(())
}
