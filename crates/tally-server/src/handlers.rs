//! REST endpoint handlers for the Tally server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Counter page with +/- buttons |
//! | `GET` | `/count` | Current value |
//! | `POST` | `/increment` | Add one, broadcast, return new value |
//! | `POST` | `/decrement` | Subtract one, broadcast, return new value |
//! | `GET` | `/health` | Liveness |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::error::ApiError;
use crate::state::{AppState, CounterValue};

/// Static counter page. It reads `/count`, posts to `/increment` and
/// `/decrement`, and listens on `/ws` for live updates.
const INDEX_HTML: &str = include_str!("../static/index.html");

/// Serve the counter page.
pub async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// `GET /count`
pub async fn get_count(State(state): State<Arc<AppState>>) -> Result<Json<CounterValue>, ApiError> {
    let value = state.gateway.current_value().await?;
    Ok(Json(CounterValue { value }))
}

/// `POST /increment`
///
/// Responds once the store write has committed. Observers are updated in
/// the background.
pub async fn increment(State(state): State<Arc<AppState>>) -> Result<Json<CounterValue>, ApiError> {
    let value = state.gateway.increment().await?;
    Ok(Json(CounterValue { value }))
}

/// `POST /decrement`
pub async fn decrement(State(state): State<Arc<AppState>>) -> Result<Json<CounterValue>, ApiError> {
    let value = state.gateway.decrement().await?;
    Ok(Json(CounterValue { value }))
}

/// `GET /health`
///
/// Does not touch the store, so it stays green while the backend is down.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let observers = state.gateway.hub().observer_count().await;
    Json(serde_json::json!({
        "status": "ok",
        "backend": state.gateway.store().name(),
        "observers": observers,
    }))
}
