//! notedesk - a command-line front-end for the notes service.
//!
//! Logs in, then lists, filters, creates, edits and bulk-edits notes. All
//! requests go through the core gateway, so an expired access token is
//! refreshed silently; when the refresh credential itself has expired the
//! user is asked to log in again and the command is retried.

mod commands;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notedesk_core::{Config, NotesClient, SessionEvent, SessionStore};

use commands::Cli;

/// Environment variable holding the password; prompted for when unset
const ENV_PASSWORD: &str = "NOTEDESK_PASSWORD";

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes buffered log lines when dropped.
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(url) = cli.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        config.base_url = url.to_string();
    }
    debug!(
        api = %config.api_base_url(),
        policy = %config.refresh_policy,
        "Configuration loaded"
    );

    let session = Arc::new(SessionStore::new());
    watch_session(&session);

    let client = NotesClient::from_config(&config, session)
        .context("Failed to create API client")?;

    let username = sign_in(&client, &cli, config.last_username.clone()).await?;
    if config.last_username.as_deref() != Some(username.as_str()) {
        config.last_username = Some(username.clone());
        if let Err(e) = config.save() {
            warn!(error = %e, "Failed to save last username");
        }
    }

    let (client_ref, cli_ref) = (&client, &cli);
    let result = commands::run_with_relogin(&client, &cli.command, &config, move || {
        let fallback = Some(username.clone());
        async move { sign_in(client_ref, cli_ref, fallback).await.map(drop) }
    })
    .await;

    // Each run signs in afresh, so give the refresh credential back on exit
    if client.session().is_authenticated() {
        if let Err(e) = client.logout().await {
            debug!(error = %e, "Logout at exit failed");
        }
    }

    result
}

/// Log session transitions as they happen
fn watch_session(session: &Arc<SessionStore>) {
    let mut events = session.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::Set => debug!("Session credentials updated"),
                SessionEvent::Cleared => warn!("Session cleared, login required"),
            }
        }
    });
}

/// Log in with the username from flags, `fallback_username` or a prompt and
/// the password from the environment or a prompt. Returns the username.
async fn sign_in(
    client: &NotesClient,
    cli: &Cli,
    fallback_username: Option<String>,
) -> Result<String> {
    let username = match cli.username.clone().or(fallback_username) {
        Some(name) => name,
        None => prompt("Username: ")?,
    };
    let password = match std::env::var(ENV_PASSWORD).ok().filter(|p| !p.is_empty()) {
        Some(password) => password,
        None => rpassword::prompt_password(format!("Password for {}: ", username))
            .context("Failed to read password")?,
    };

    client
        .login(&username, &password)
        .await
        .with_context(|| format!("Login failed for {}", username))?;
    info!(username = %username, "Signed in");
    Ok(username)
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", label)?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("No username given");
    }
    Ok(value)
}
