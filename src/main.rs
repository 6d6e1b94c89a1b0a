mod config;
mod error;
mod handler;
mod relay;
mod server;
mod submission;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, ENV_BOT_TOKEN, ENV_CHAT_ID};
use crate::handler::FormRelayHandler;
use crate::relay::{Relay, TelegramRelay};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,guestbook_relay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Bind: {}", config.server.bind);
    info!("  Path: {}", config.server.path);
    info!("  Telegram API: {}", config.telegram.api_base_url);

    let relay: Option<Arc<dyn Relay>> = match config.telegram.credentials() {
        Some(credentials) => {
            info!("  Chat: {}", credentials.chat_id);
            let relay: Arc<dyn Relay> =
                Arc::new(TelegramRelay::new(&config.telegram, credentials)?);
            Some(relay)
        }
        None => {
            warn!(
                "{} or {} not set; every submission will fail until configured",
                ENV_BOT_TOKEN, ENV_CHAT_ID
            );
            None
        }
    };

    let handler = Arc::new(FormRelayHandler::new(relay));
    let app = server::router(handler, &config.server.path);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;

    info!("Relay is listening on {}", config.server.bind);
    server::serve(listener, app).await?;

    Ok(())
}
