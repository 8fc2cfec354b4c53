//! Quiz Duel Server
//!
//! Serves the quiz engine over WebSocket. Configuration comes from
//! `QUIZ_*` environment variables; a first argument overrides the bind
//! address.

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

use quiz_duel::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Quiz Duel Server v{}", VERSION);

    let mut config = ServerConfig::from_env()?;
    if let Some(addr) = std::env::args().nth(1) {
        config.bind_addr = addr
            .parse()
            .with_context(|| format!("invalid bind address argument: {}", addr))?;
    }

    let catalog = config.load_catalog().context("failed to load question catalog")?;
    info!(
        "Loaded {} topics, {} questions ({})",
        catalog.topics().len(),
        catalog.question_count(),
        config
            .catalog_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string()),
    );

    let server = Arc::new(GameServer::new(config, catalog));

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                signal_server.shutdown();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
