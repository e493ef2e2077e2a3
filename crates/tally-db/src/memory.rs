//! In-process counter store.
//!
//! Holds the counter in a [`Mutex`] so every write is a single critical
//! section. Nothing survives a restart; this backend is meant for tests and
//! throwaway deployments. It can be switched offline to exercise the
//! failure path of the layers above it.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use crate::change::StateChange;
use crate::error::StoreError;

/// A counter held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StateChange>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Create a store holding `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `value` at revision `0`.
    pub fn with_value(value: i64) -> Self {
        Self {
            state: Mutex::new(StateChange::new(value, 0)),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate the backing medium going away (or coming back).
    ///
    /// While offline every operation fails with [`StoreError::Offline`]
    /// and the stored value is left untouched.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::Acquire) {
            return Err(StoreError::Offline);
        }
        Ok(())
    }

    /// Read the current state.
    pub async fn read(&self) -> Result<StateChange, StoreError> {
        self.ensure_online()?;
        Ok(*self.state.lock().await)
    }

    /// Add `delta` under the lock and return the committed state.
    pub async fn apply_delta(&self, delta: i64) -> Result<StateChange, StoreError> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        let next = state.apply(delta)?;
        *state = next;
        Ok(next)
    }

    /// Force the value to zero under the lock.
    pub async fn reset(&self) -> Result<StateChange, StoreError> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        let next = state.zeroed()?;
        *state = next;
        Ok(next)
    }
}
