//! Tally server binary.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration (`tally-config.yaml` + environment)
//! 3. Open the configured counter store
//! 4. Build the update gateway and its broadcast hub
//! 5. Spawn the daily reset scheduler, if enabled
//! 6. Serve HTTP + `WebSocket` until `Ctrl-C` or `SIGTERM`
//! 7. Stop the scheduler and close the store

use std::sync::Arc;

use tally_core::config::{ConfigError, OpenStoreError, TallyConfig};
use tally_core::gateway::UpdateGateway;
use tally_core::schedule::ScheduleError;
use tally_core::scheduler::spawn_scheduler;
use tally_server::{AppState, ServerConfig, ServerError, shutdown_signal, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Top-level error for the server binary.
#[derive(Debug, thiserror::Error)]
enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The counter store could not be opened.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: OpenStoreError,
    },

    /// The reset scheduler could not be started.
    #[error("scheduler error: {source}")]
    Schedule {
        /// The underlying schedule error.
        #[from]
        source: ScheduleError,
    },

    /// The HTTP server failed.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: ServerError,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("tally-server starting");

    // 2. Load configuration.
    let config = TallyConfig::load()?;
    let schedule = config.reset.active_schedule()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        backend = ?config.store.backend,
        reset_at = ?schedule.as_ref().map(ToString::to_string),
        "Configuration loaded"
    );

    // 3. Open the store.
    let store = config.store.open().await?;

    // 4. Gateway + hub.
    let gateway = UpdateGateway::new(Arc::clone(&store));

    // 5. Daily reset.
    let scheduler = match schedule {
        Some(schedule) => Some(spawn_scheduler(gateway.clone(), schedule)?),
        None => {
            info!("Daily reset disabled");
            None
        }
    };

    // 6. Serve until Ctrl-C.
    let server_config = ServerConfig::from(&config.server);
    let result = start_server(
        &server_config,
        Arc::new(AppState::new(gateway)),
        shutdown_signal(),
    )
    .await;

    // 7. Stop the scheduler and release the store, whether or not the
    //    server exited cleanly.
    if let Some(handle) = scheduler {
        handle.abort();
        info!("Reset scheduler stopped");
    }
    store.close().await;

    result?;
    info!("tally-server exited cleanly");
    Ok(())
}
