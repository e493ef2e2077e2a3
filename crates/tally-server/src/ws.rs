//! `WebSocket` handler for live counter updates.
//!
//! Clients connect to `GET /ws`. On connect they are registered with the
//! hub and immediately receive the current value; after that they get one
//! [`CounterMessage`] per committed change they keep up with. A client
//! that reads slowly skips stale values and resumes at the newest one.
//!
//! The connection task owns the observer's lifetime: when the client goes
//! away, or a send to it fails, the observer is unregistered.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tally_core::hub::Subscription;
use tracing::{debug, warn};

use crate::state::{AppState, CounterMessage};

/// Upgrade an HTTP request to a `WebSocket` and start streaming values.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_counter(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut subscription = match state.gateway.subscribe().await {
        Ok(sub) => sub,
        Err(e) => {
            warn!(error = %e, "Could not register observer, closing socket");
            if let Err(e) = socket.send(Message::Close(None)).await {
                debug!("Close frame not sent: {e}");
            }
            return;
        }
    };
    let id = subscription.id();
    debug!(observer = %id, "WebSocket client connected");

    pump(&mut socket, &mut subscription).await;

    state.gateway.hub().unregister(id).await;
    debug!(observer = %id, "WebSocket client disconnected");
}

/// Forward snapshots to the socket until either side goes away.
async fn pump(socket: &mut WebSocket, subscription: &mut Subscription) {
    loop {
        tokio::select! {
            change = subscription.next() => {
                let Some(change) = change else {
                    debug!(observer = %subscription.id(), "Observer dropped by hub");
                    return;
                };
                let json = match serde_json::to_string(&CounterMessage { value: change.value }) {
                    Ok(j) => j,
                    Err(e) => {
                        warn!("Failed to serialize counter message: {e}");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    debug!(observer = %subscription.id(), "Send failed");
                    return;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    // Clients have nothing to say; ignore text, binary, pong.
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
