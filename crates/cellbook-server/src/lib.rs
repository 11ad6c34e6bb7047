//! Cellbook execution orchestrator and host bridge.
//!
//! # Architecture
//!
//! The server consists of:
//! - **Session**: Orchestrates cell execution on a restartable execution unit
//! - **AutoSaver**: Debounces edits into auto-save requests
//! - **Protocol**: Defines host/session message types
//! - **Routes**: HTTP and WebSocket handlers

pub mod autosave;
pub mod error;
pub mod protocol;
pub mod routes;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use cellbook_core::UnitSpawner;

pub use autosave::AutoSaver;
pub use error::{ServerError, ServerResult};
pub use protocol::{CellSource, ClientMessage, ServerMessage};
pub use routes::{AppState, create_router};
pub use session::{SessionConfig, SessionHandle, UnitKind};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    fn addr(&self) -> ServerResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }
}

/// Start a session and serve it until Ctrl+C.
pub async fn serve(
    config: ServerConfig,
    session_config: SessionConfig,
    spawner: Arc<dyn UnitSpawner>,
) -> ServerResult<()> {
    let addr = config.addr()?;
    let session = SessionHandle::start(session_config, spawner)?;
    let app = create_router(AppState { session });

    tracing::info!("Starting cellbook server at ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    // Handle Ctrl+C for graceful shutdown
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.addr().unwrap().to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_invalid_address() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            port: 1,
        };
        assert!(matches!(config.addr(), Err(ServerError::InvalidAddress(_))));
    }
}
