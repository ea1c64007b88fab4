use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use agent_chat::{ChatClient, ChatError, Config};

mod app;
mod handler;
mod repl;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "agent-chat", version)]
#[command(about = "Chat with an agent server from the terminal")]
struct Cli {
    /// Base URL of the chat server (the widget posts to <URL>/chat)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Log filter (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Line-oriented chat on stdin/stdout
    Repl,
    /// Send one message and print the reply
    Send {
        /// Message text
        message: String,
    },
    /// Show or update the saved configuration
    Config {
        /// Persist a new server URL
        #[arg(long)]
        set_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // No up-front load here: --set-url may be repairing a malformed file
    if let Some(Commands::Config { set_url }) = &cli.command {
        let level = cli.log_level.clone().unwrap_or_else(|| Config::new().log_level);
        init_stderr_logging(&level);
        return show_or_update_config(set_url.clone());
    }

    let mut config = Config::load()
        .context("failed to load configuration")?
        .with_env_overrides();
    if let Some(url) = &cli.url {
        config.server_url = url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    match cli.command {
        Some(Commands::Repl) => {
            init_file_logging(&config.log_level)?;
            config.validate()?;
            repl::run(&ChatClient::new(&config.server_url)).await
        }
        Some(Commands::Send { message }) => {
            init_stderr_logging(&config.log_level);
            config.validate()?;
            repl::send_once(&ChatClient::new(&config.server_url), &message).await
        }
        _ => {
            init_file_logging(&config.log_level)?;
            config.validate()?;
            info!(server = %config.server_url, "starting terminal chat");
            run_tui(ChatClient::new(&config.server_url)).await
        }
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// The terminal owns stdout/stderr while the UI runs, so logs go to a file
fn init_file_logging(level: &str) -> Result<()> {
    let file = open_log(&Config::log_path()?)?;
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();
    Ok(())
}

fn open_log(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

fn init_stderr_logging(level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn show_or_update_config(set_url: Option<String>) -> Result<()> {
    let path = Config::get_config_path()?;

    if let Some(url) = set_url {
        update_config_url(&path, url)?;
        info!(path = %path.display(), "configuration saved");
    }

    let current = Config::read_from(&path)?;
    println!("config file: {}", path.display());
    println!("{}", serde_json::to_string_pretty(&current)?);
    Ok(())
}

/// Persist a new server URL. A malformed file is replaced by defaults plus
/// the new URL.
fn update_config_url(path: &Path, url: String) -> Result<Config> {
    // Saved values stay unexpanded so ${VAR} placeholders survive
    let mut saved = match Config::read_from(path) {
        Ok(config) => config,
        Err(err @ ChatError::ConfigParse { .. }) => {
            warn!(error = %err, "replacing malformed configuration");
            Config::new()
        }
        Err(err) => return Err(err.into()),
    };
    saved.server_url = url;
    saved.validate()?;
    saved.save_to(path)?;
    Ok(saved)
}

async fn run_tui(client: ChatClient) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(client);

    let result = run_loop(&mut terminal, &mut events, &mut app).await;

    app.shutdown();
    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, events: &mut EventHandler, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }

        app.poll_pending().await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_set_url_repairs_malformed_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let saved = update_config_url(&path, "http://10.0.0.2:5000".to_string()).unwrap();
        assert_eq!(saved.server_url, "http://10.0.0.2:5000");

        let reread = Config::read_from(&path).unwrap();
        assert_eq!(reread.server_url, "http://10.0.0.2:5000");
        assert_eq!(reread.log_level, Config::new().log_level);
    }

    #[test]
    fn test_set_url_keeps_other_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"server_url": "http://a", "log_level": "debug"}"#).unwrap();

        update_config_url(&path, "https://b".to_string()).unwrap();

        let reread = Config::read_from(&path).unwrap();
        assert_eq!(reread.server_url, "https://b");
        assert_eq!(reread.log_level, "debug");
    }

    #[test]
    fn test_set_url_rejects_bad_scheme_without_writing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        assert!(update_config_url(&path, "ftp://x".to_string()).is_err());
        assert!(!path.exists());
    }
}
