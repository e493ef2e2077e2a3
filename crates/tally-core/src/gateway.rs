//! Update gateway: the request-facing entry point for counter changes.
//!
//! Every write, whether it comes from a client or from the daily reset,
//! follows the same two steps:
//!
//! 1. Commit through the [`CounterStore`] (one atomic operation).
//! 2. Hand the committed [`StateChange`] to the [`BroadcastHub`].
//!
//! Step 2 only runs after step 1 succeeded, so observers never see a value
//! that was not committed. The hub only queues the value into each
//! observer's slot, so the caller's response does not wait on any socket.

use std::sync::Arc;

use tally_db::{CounterStore, StateChange};
use tracing::warn;

use crate::error::TallyError;
use crate::hub::{BroadcastHub, Subscription};

/// Facade over the store and the hub.
#[derive(Clone)]
pub struct UpdateGateway {
    store: Arc<CounterStore>,
    hub: Arc<BroadcastHub>,
}

impl UpdateGateway {
    /// Wire a gateway to a store, creating a fresh hub for it.
    pub fn new(store: Arc<CounterStore>) -> Self {
        let hub = Arc::new(BroadcastHub::new(Arc::clone(&store)));
        Self { store, hub }
    }

    /// Add one and broadcast. Returns the committed value.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::StorageUnavailable`] if the store write fails;
    /// nothing is broadcast in that case.
    pub async fn increment(&self) -> Result<i64, TallyError> {
        self.apply(1).await
    }

    /// Subtract one and broadcast. Returns the committed value.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::StorageUnavailable`] if the store write fails;
    /// nothing is broadcast in that case.
    pub async fn decrement(&self) -> Result<i64, TallyError> {
        self.apply(-1).await
    }

    /// Current value, for clients that poll instead of subscribing.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::StorageUnavailable`] if the store read fails.
    pub async fn current_value(&self) -> Result<i64, TallyError> {
        Ok(self.store.read().await?.value)
    }

    /// Force the counter to zero and broadcast.
    ///
    /// Not reachable from clients; the reset scheduler is the only caller
    /// outside tests.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::StorageUnavailable`] if the store write fails.
    pub async fn reset(&self) -> Result<StateChange, TallyError> {
        let change = self.store.reset().await.inspect_err(|e| {
            warn!(error = %e, "Counter reset failed, nothing broadcast");
        })?;
        self.hub.publish(change).await;
        Ok(change)
    }

    /// Register a new observer with the hub.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::StorageUnavailable`] if the join-time read fails.
    pub async fn subscribe(&self) -> Result<Subscription, TallyError> {
        Ok(self.hub.register().await?)
    }

    /// The hub this gateway publishes to.
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// The store this gateway writes through.
    pub fn store(&self) -> &Arc<CounterStore> {
        &self.store
    }

    async fn apply(&self, delta: i64) -> Result<i64, TallyError> {
        let change = self.store.apply_delta(delta).await.inspect_err(|e| {
            warn!(delta, error = %e, "Counter write failed, nothing broadcast");
        })?;
        self.hub.publish(change).await;
        Ok(change.value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tally_db::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn increment_then_decrement() {
        let gateway = UpdateGateway::new(Arc::new(CounterStore::from(MemoryStore::new())));
        assert_eq!(gateway.increment().await.unwrap(), 1);
        assert_eq!(gateway.decrement().await.unwrap(), 0);
        assert_eq!(gateway.decrement().await.unwrap(), -1);
        assert_eq!(gateway.current_value().await.unwrap(), -1);
    }

    #[tokio::test]
    async fn reset_returns_zero() {
        let gateway = UpdateGateway::new(Arc::new(CounterStore::from(MemoryStore::with_value(8))));
        assert_eq!(gateway.reset().await.unwrap().value, 0);
        assert_eq!(gateway.current_value().await.unwrap(), 0);
    }
}
