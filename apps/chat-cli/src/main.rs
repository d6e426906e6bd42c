//! chatlink terminal client entry point.

mod config;
mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use chatlink_connection::{
    ConnectionEvent, ConnectionManager, FileTokenStore, MemoryTokenStore, SessionConfig,
    TokenStore, WsConnector,
};
use chatlink_protocol::Endpoints;

use config::ClientConfig;
use console::Input;

#[derive(Parser, Debug)]
#[command(name = "chatlink", version, about = "Terminal chat over a resilient WebSocket session")]
struct Args {
    /// Path to the configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// WebSocket base URL (overrides config and environment).
    #[arg(long)]
    url: Option<String>,

    /// Keep the session token in memory only.
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chatlink=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    debug!(?args, "arguments parsed");

    let config_path = match args.config {
        Some(path) => path,
        None => config::config_path()?,
    };
    let mut config = ClientConfig::load(&config_path)?;
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(url) = args.url {
        config.ws_url = url;
    }
    info!(path = %config_path.display(), url = %config.ws_url, "configuration loaded");

    let endpoints = Endpoints::new(&config.ws_url)
        .with_context(|| format!("invalid WebSocket URL {:?}", config.ws_url))?;

    let store: Arc<dyn TokenStore> = if args.ephemeral {
        Arc::new(MemoryTokenStore::new())
    } else {
        let path = config
            .token_path()
            .context("no token path configured and no default available")?;
        debug!(path = %path.display(), "using file token store");
        Arc::new(FileTokenStore::new(path))
    };

    let mut session = SessionConfig::new(endpoints);
    session.reconnect = config.reconnect_config();
    session.authenticated = true;

    let manager = ConnectionManager::start(session, Arc::new(WsConnector::new()), store);
    let mut events = manager
        .take_events()
        .await
        .context("event stream already taken")?;

    println!("{}", console::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut awaiting_ack = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => awaiting_ack |= render_event(&manager, event),
                None => break,
            },

            line = lines.next_line() => match line? {
                Some(line) => {
                    let input = console::parse_input(&line, awaiting_ack);
                    if input == Input::Acknowledge {
                        awaiting_ack = false;
                    }
                    if !handle_input(&manager, input).await? {
                        break;
                    }
                }
                None => break,
            },

            _ = tokio::signal::ctrl_c() => break,
        }
    }

    manager.shutdown().await;
    info!("bye");
    Ok(())
}

/// Returns `true` when the event needs the user's acknowledgement.
fn render_event(manager: &ConnectionManager, event: ConnectionEvent) -> bool {
    match event {
        ConnectionEvent::StatusChanged(status) => {
            let error = manager.connection_error();
            println!("{}", console::status_banner(status, error.as_deref()));
        }
        ConnectionEvent::Message(message) => println!("{}", console::transcript_line(&message)),
        ConnectionEvent::Reconnecting { attempt, delay } => {
            println!("{}", console::reconnecting_line(attempt, delay));
        }
        ConnectionEvent::TokenRotated => debug!("session token updated"),
        ConnectionEvent::AuthenticationChanged(authenticated) => {
            info!(authenticated, "sign-in state changed");
        }
        ConnectionEvent::SessionExpired => {
            print!("{}", console::session_expired_notice());
            return true;
        }
    }
    false
}

/// Returns `false` when the user asked to quit.
async fn handle_input(manager: &ConnectionManager, input: Input) -> anyhow::Result<bool> {
    match input {
        Input::Message(text) => manager.send_chat_message(text).await?,
        Input::Retry => manager.initialize_connections().await?,
        Input::Login => manager.set_authenticated(true).await?,
        Input::Logout => manager.set_authenticated(false).await?,
        // Back to the sign-in dialogue; the next token opens chat.
        Input::Acknowledge => manager.set_authenticated(true).await?,
        Input::Status => {
            let channels = manager.channels().await?;
            let error = manager.connection_error();
            println!("{}", console::status_banner(manager.status(), error.as_deref()));
            println!(
                "auth: {:?}  chat: {:?}",
                channels.auth.map(|c| (c.id, c.open)),
                channels.chat.map(|c| (c.id, c.open))
            );
        }
        Input::Help => println!("{}", console::HELP),
        Input::Quit => return Ok(false),
        Input::Unknown(command) => warn!(%command, "unknown command, try /help"),
        Input::Empty => {}
    }
    Ok(true)
}
