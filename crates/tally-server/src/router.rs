//! Axum router construction for the Tally server.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// - `GET /` -- counter page
/// - `GET /ws` -- `WebSocket` value stream
/// - `GET /count` -- current value
/// - `POST /increment`, `POST /decrement` -- apply a delta
/// - `GET /health` -- liveness
///
/// CORS allows any origin so the page can be hosted elsewhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/ws", get(ws::ws_counter))
        .route("/count", get(handlers::get_count))
        .route("/increment", post(handlers::increment))
        .route("/decrement", post(handlers::decrement))
        .route("/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
