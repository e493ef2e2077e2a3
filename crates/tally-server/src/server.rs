//! HTTP server lifecycle management.
//!
//! Provides [`start_server`] which binds to a TCP port and runs the Axum
//! server until the given shutdown future resolves, and [`serve`] for an
//! already-bound listener. [`shutdown_signal`] is the production shutdown
//! future (`Ctrl-C` or `SIGTERM`).

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tally_core::config::ServerSettings;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
        }
    }
}

/// Bind and serve until `shutdown` resolves.
///
/// In-flight requests are allowed to finish once `shutdown` resolves;
/// no new connections are accepted.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is invalid or the listener
/// cannot bind, or [`ServerError::Serve`] on a fatal I/O error.
pub async fn start_server<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    serve(listener, state, shutdown).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] on a fatal I/O error.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Tally server listening");
    }

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("Tally server stopped");
    Ok(())
}

/// Resolve when the process is asked to stop: `Ctrl-C` anywhere, plus
/// `SIGTERM` on Unix (`docker stop`, systemd, Kubernetes).
pub async fn shutdown_signal() {
    if let Err(e) = wait_for_signal().await {
        tracing::error!(error = %e, "Failed to install signal handlers, shutting down");
        return;
    }
    info!("Shutdown signal received");
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = sigterm.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_settings() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
    }

    #[tokio::test]
    async fn invalid_host_is_bind_error() {
        use tally_core::gateway::UpdateGateway;
        use tally_db::{CounterStore, MemoryStore};

        let gateway = UpdateGateway::new(Arc::new(CounterStore::from(MemoryStore::new())));
        let config = ServerConfig {
            host: "not an address".to_owned(),
            port: 0,
        };
        let result = start_server(&config, Arc::new(AppState::new(gateway)), async {}).await;
        assert!(matches!(result, Err(ServerError::Bind(_))));
    }
}
