//! Shared application state and wire types for the Tally server.
//!
//! [`AppState`] is a thin wrapper around the [`UpdateGateway`]: every
//! handler and every socket task goes through the same gateway, and so
//! through the same store and hub.

use tally_core::gateway::UpdateGateway;

/// Body of `GET /count`, `POST /increment` and `POST /decrement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CounterValue {
    /// The counter value.
    pub value: i64,
}

/// Message pushed to socket observers.
///
/// Serializes as `{"type":"counter","value":n}`; browser clients filter
/// on the `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename = "counter")]
pub struct CounterMessage {
    /// The counter value.
    pub value: i64,
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The single write path into the counter.
    pub gateway: UpdateGateway,
}

impl AppState {
    /// Wrap a gateway.
    pub const fn new(gateway: UpdateGateway) -> Self {
        Self { gateway }
    }
}
