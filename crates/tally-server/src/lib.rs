//! HTTP + `WebSocket` surface for the Tally live counter.
//!
//! - **REST endpoints** (`/count`, `/increment`, `/decrement`) backed by
//!   the [`UpdateGateway`]
//! - **`WebSocket` endpoint** (`/ws`) streaming `{"type":"counter"}`
//!   messages from the broadcast hub
//! - **Counter page** (`GET /`) and liveness (`GET /health`)
//!
//! The binary (`tally-server`) wires configuration, the store, the gateway
//! and the daily reset scheduler together and serves this router.
//!
//! [`UpdateGateway`]: tally_core::gateway::UpdateGateway

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, serve, shutdown_signal, start_server};
pub use state::{AppState, CounterMessage, CounterValue};
