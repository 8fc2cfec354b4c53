//! WebSocket Game Server
//!
//! Async WebSocket gateway. Accepts connections, assigns each an opaque
//! handle, feeds parsed events to the coordinator, and drains outbound
//! messages through a per-connection writer task.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::core::catalog::QuestionCatalog;
use crate::core::ids::ConnectionId;
use crate::network::coordinator::QuizCoordinator;
use crate::network::notify::{ChannelNotifier, Notifier, Recipients};
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Per-connection outbound channel capacity.
    pub outbound_buffer: usize,
    /// Catalog file; built-in catalog when unset.
    pub catalog_path: Option<PathBuf>,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            max_connections: 1000,
            outbound_buffer: 64,
            catalog_path: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, GameServerError> {
        let defaults = Self::default();

        let bind_addr = match std::env::var("QUIZ_BIND_ADDR") {
            Ok(v) => v.parse()
                .map_err(|_| GameServerError::Config(format!("invalid QUIZ_BIND_ADDR: {}", v)))?,
            Err(_) => defaults.bind_addr,
        };

        let max_connections = match std::env::var("QUIZ_MAX_CONNECTIONS") {
            Ok(v) => v.parse()
                .map_err(|_| GameServerError::Config(format!("invalid QUIZ_MAX_CONNECTIONS: {}", v)))?,
            Err(_) => defaults.max_connections,
        };

        let outbound_buffer = match std::env::var("QUIZ_OUTBOUND_BUFFER") {
            Ok(v) => v.parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| GameServerError::Config(format!("invalid QUIZ_OUTBOUND_BUFFER: {}", v)))?,
            Err(_) => defaults.outbound_buffer,
        };

        Ok(Self {
            bind_addr,
            max_connections,
            outbound_buffer,
            catalog_path: std::env::var("QUIZ_CATALOG_PATH").ok().map(PathBuf::from),
            ..defaults
        })
    }

    /// Load the configured catalog, or the built-in one.
    pub fn load_catalog(&self) -> Result<QuestionCatalog, GameServerError> {
        match &self.catalog_path {
            Some(path) => Ok(QuestionCatalog::load(path)?),
            None => Ok(QuestionCatalog::builtin()),
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// Catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(#[from] crate::core::catalog::CatalogError),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Outbound routing.
    notifier: Arc<ChannelNotifier>,
    /// Lobby and sessions.
    coordinator: Arc<QuizCoordinator>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server over a catalog.
    pub fn new(config: ServerConfig, catalog: QuestionCatalog) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let notifier = Arc::new(ChannelNotifier::new());
        let coordinator = Arc::new(QuizCoordinator::new(Arc::new(catalog), notifier.clone()));

        Self {
            config,
            notifier,
            coordinator,
            shutdown_tx,
        }
    }

    /// Run the server until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Quiz server listening on {}", self.config.bind_addr);
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.notifier.connection_count() >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let notifier = self.notifier.clone();
        let coordinator = self.coordinator.clone();
        let buffer = self.config.outbound_buffer;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let connection = ConnectionId::generate();
            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(buffer);
            notifier.register(connection, msg_tx);
            info!("Connection {} established from {}", connection, addr);

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                Self::handle_text(connection, &text, &coordinator, notifier.as_ref()).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Connection {} closed", connection.short());
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", connection.short(), e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        notifier.notify(Recipients::One(connection), ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        });
                        break;
                    }
                }
            }

            // Cleanup
            coordinator.disconnect(&connection).await;
            notifier.unregister(&connection);
            // Dropping the channel lets the writer flush what is queued and stop.
            let _ = sender_task.await;

            info!("Connection {} cleaned up", connection);
        });
    }

    /// Parse and dispatch one text frame.
    async fn handle_text(
        connection: ConnectionId,
        text: &str,
        coordinator: &QuizCoordinator,
        notifier: &dyn Notifier,
    ) {
        let client_msg = match ClientMessage::from_json(text) {
            Ok(m) => m,
            Err(e) => {
                debug!("Invalid message from {}: {}", connection.short(), e);
                notifier.notify(
                    Recipients::One(connection),
                    ServerMessage::error(ErrorCode::InvalidMessage, "Invalid message format"),
                );
                return;
            }
        };

        coordinator.handle_message(connection, client_msg).await;
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub fn connection_count(&self) -> usize {
        self.notifier.connection_count()
    }

    /// Get active session count.
    pub async fn session_count(&self) -> usize {
        self.coordinator.sessions().session_count().await
    }

    /// Coordinator behind this server.
    pub fn coordinator(&self) -> &Arc<QuizCoordinator> {
        &self.coordinator
    }
}
