//! The counter store facade.
//!
//! Uses enum dispatch instead of trait objects because async methods are
//! not dyn-compatible. Every backend implements the same three operations
//! and guarantees that each write is a single indivisible step against its
//! medium, so callers never need their own locking.

use crate::change::StateChange;
use crate::dragonfly::DragonflyStore;
use crate::error::StoreError;
use crate::file::FileStore;
use crate::memory::MemoryStore;
use crate::postgres::PostgresStore;

/// Durable holder of the single shared counter.
pub enum CounterStore {
    /// In-process store (not durable).
    Memory(MemoryStore),
    /// JSON document on the local filesystem.
    File(FileStore),
    /// `Dragonfly`/Redis hash.
    Dragonfly(DragonflyStore),
    /// `PostgreSQL` row.
    Postgres(PostgresStore),
}

impl CounterStore {
    /// Read the current state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing medium cannot be reached.
    pub async fn read(&self) -> Result<StateChange, StoreError> {
        match self {
            Self::Memory(store) => store.read().await,
            Self::File(store) => store.read().await,
            Self::Dragonfly(store) => store.read().await,
            Self::Postgres(store) => store.read().await,
        }
    }

    /// Atomically add `delta` and return the committed state.
    ///
    /// On error the stored value is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing medium is unreachable, rejects
    /// the write, or the result would overflow.
    pub async fn apply_delta(&self, delta: i64) -> Result<StateChange, StoreError> {
        let change = match self {
            Self::Memory(store) => store.apply_delta(delta).await,
            Self::File(store) => store.apply_delta(delta).await,
            Self::Dragonfly(store) => store.apply_delta(delta).await,
            Self::Postgres(store) => store.apply_delta(delta).await,
        }?;
        tracing::debug!(
            backend = self.name(),
            delta,
            value = change.value,
            revision = change.revision,
            "Committed counter delta"
        );
        Ok(change)
    }

    /// Atomically force the value to zero, whatever it was before.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing medium is unreachable or
    /// rejects the write.
    pub async fn reset(&self) -> Result<StateChange, StoreError> {
        let change = match self {
            Self::Memory(store) => store.reset().await,
            Self::File(store) => store.reset().await,
            Self::Dragonfly(store) => store.reset().await,
            Self::Postgres(store) => store.reset().await,
        }?;
        tracing::debug!(
            backend = self.name(),
            revision = change.revision,
            "Committed counter reset"
        );
        Ok(change)
    }

    /// Release backend connections. In-process backends have nothing to
    /// release.
    pub async fn close(&self) {
        match self {
            Self::Memory(_) | Self::File(_) => {}
            Self::Dragonfly(store) => store.close().await,
            Self::Postgres(store) => store.close().await,
        }
    }

    /// Human-readable backend name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::File(_) => "file",
            Self::Dragonfly(_) => "dragonfly",
            Self::Postgres(_) => "postgres",
        }
    }
}

impl From<MemoryStore> for CounterStore {
    fn from(store: MemoryStore) -> Self {
        Self::Memory(store)
    }
}

impl From<FileStore> for CounterStore {
    fn from(store: FileStore) -> Self {
        Self::File(store)
    }
}

impl From<DragonflyStore> for CounterStore {
    fn from(store: DragonflyStore) -> Self {
        Self::Dragonfly(store)
    }
}

impl From<PostgresStore> for CounterStore {
    fn from(store: PostgresStore) -> Self {
        Self::Postgres(store)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn close_leaves_local_backends_usable() {
        let dir = tempfile::tempdir().unwrap();
        let file = CounterStore::from(FileStore::open(dir.path().join("c.json")).await.unwrap());
        let memory = CounterStore::from(MemoryStore::with_value(4));

        for store in [file, memory] {
            store.apply_delta(1).await.unwrap();
            store.close().await;
            assert!(store.read().await.unwrap().revision >= 1);
        }
    }
}
