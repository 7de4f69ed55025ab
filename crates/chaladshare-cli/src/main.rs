//! chaladshare - manage your chaladshare friends from the terminal.
//!
//! Logs in with a session cookie, then reads one command per line and
//! prints the active friends view after every change.

mod app;
mod ui;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, AppState};
use chaladshare_core::friends::Wakeup;
use chaladshare_core::Config;
use ui::input::handle_line;
use ui::render;

/// Log file written inside the cache directory
const LOG_FILE: &str = "chaladshare.log";

#[derive(Parser, Debug)]
#[command(name = "chaladshare", version, about = "Manage your chaladshare friends")]
struct Cli {
    /// Base URL of the chaladshare API
    #[arg(long, env = "CHALADSHARE_API_URL")]
    api_url: Option<String>,

    /// Email to log in with
    #[arg(long, env = "CHALADSHARE_EMAIL")]
    email: Option<String>,

    /// End the saved session and forget the stored password, then exit
    #[arg(long)]
    logout: bool,
}

/// Initialize the tracing subscriber, writing to a log file so output
/// never interleaves with the interactive prompt.
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    std::fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Ok(guard)
}

enum Event {
    Line(Option<String>),
    Wakeup(Wakeup),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: could not load config ({}), using defaults", e);
        Config::default()
    });
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }

    let _log_guard = init_tracing(&config.cache_dir()?)?;
    info!(api = %config.api_base_url, "chaladshare starting");

    let mut app = App::new(config, cli.email)?;

    if cli.logout {
        app.logout().await?;
        println!("Logged out.");
        return Ok(());
    }

    if !app.is_authenticated() {
        app.login_interactive().await?;
    }
    app.connect();

    let result = run(&mut app).await;

    info!("chaladshare shutting down");
    result
}

async fn run(app: &mut App) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    render::print_help();
    render::prompt();

    while app.state != AppState::Quitting {
        // Both branches are cancel-safe
        let event = tokio::select! {
            line = lines.next_line() => Event::Line(line?),
            Some(wakeup) = app.coordinator.next_wakeup() => Event::Wakeup(wakeup),
        };

        match event {
            Event::Line(None) => break,
            Event::Line(Some(line)) => {
                handle_line(app, &line).await;
                if app.state == AppState::Quitting {
                    break;
                }
                render::render(app);
                render::prompt();
            }
            Event::Wakeup(wakeup) => {
                app.coordinator.handle(wakeup);
                app.process_notifications().await;
                if !app.coordinator.is_loading() {
                    render::render(app);
                    render::prompt();
                }
            }
        }
    }

    Ok(())
}
