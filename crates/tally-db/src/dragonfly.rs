//! `Dragonfly` (Redis-compatible) counter store.
//!
//! The counter lives in a single hash under the configured key:
//!
//! | Field | Type | Description |
//! |-------|------|-------------|
//! | `value` | Integer | Current counter value |
//! | `revision` | Integer | Number of committed writes |
//!
//! Every write is one `MULTI`/`EXEC` block: the value change (`HINCRBY` or
//! `HSET 0`) and the revision bump run back to back on the server with no
//! other client's command in between. The service never reads the value
//! and writes it back from the client side.

use fred::prelude::*;

use crate::change::StateChange;
use crate::error::StoreError;

/// Hash field holding the counter value.
const VALUE_FIELD: &str = "value";

/// Hash field holding the write sequence number.
const REVISION_FIELD: &str = "revision";

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`] bound to one counter key.
#[derive(Clone)]
pub struct DragonflyStore {
    client: Client,
    key: String,
}

impl DragonflyStore {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str, key: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!(key, "Connected to Dragonfly");
        Ok(Self {
            client,
            key: key.to_owned(),
        })
    }

    /// Read the current state. A missing key reads as value `0`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the read fails.
    pub async fn read(&self) -> Result<StateChange, StoreError> {
        let (value, revision): (Option<i64>, Option<u64>) = self
            .client
            .hmget(self.key.as_str(), vec![VALUE_FIELD, REVISION_FIELD])
            .await?;
        Ok(StateChange::new(value.unwrap_or(0), revision.unwrap_or(0)))
    }

    /// Atomically add `delta` and return the committed state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the transaction fails, including
    /// when the server rejects the increment as an overflow.
    pub async fn apply_delta(&self, delta: i64) -> Result<StateChange, StoreError> {
        let trx = self.client.multi();
        let _: () = trx.hincrby(self.key.as_str(), VALUE_FIELD, delta).await?;
        let _: () = trx.hincrby(self.key.as_str(), REVISION_FIELD, 1).await?;
        let (value, revision): (i64, u64) = trx.exec(true).await?;
        Ok(StateChange::new(value, revision))
    }

    /// Atomically force the value to zero and return the committed state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the transaction fails.
    pub async fn reset(&self) -> Result<StateChange, StoreError> {
        let trx = self.client.multi();
        let _: () = trx.hset(self.key.as_str(), (VALUE_FIELD, 0_i64)).await?;
        let _: () = trx.hincrby(self.key.as_str(), REVISION_FIELD, 1).await?;
        let (_, revision): (i64, u64) = trx.exec(true).await?;
        Ok(StateChange::new(0, revision))
    }

    /// Delete the counter key.
    ///
    /// **WARNING:** This discards the counter. Only use for testing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the delete fails.
    pub async fn delete(&self) -> Result<(), StoreError> {
        let _: u32 = self.client.del(self.key.as_str()).await?;
        Ok(())
    }

    /// Close the connection.
    pub async fn close(&self) {
        if let Err(e) = self.client.quit().await {
            tracing::warn!(error = %e, "Dragonfly quit failed");
            return;
        }
        tracing::info!("Dragonfly connection closed");
    }
}
