//! Broadcast hub: the registry of live observers.
//!
//! Each observer owns one [`watch`] slot holding the newest
//! [`StateChange`] it has been offered. Publishing writes into every slot
//! and returns immediately; the observer's connection task drains its own
//! slot at whatever pace its socket allows. A slow observer therefore only
//! ever skips stale values, and never holds up the publisher or the other
//! observers.
//!
//! A slot only moves forward to a strictly newer store revision. Two
//! publishers racing each other (a client increment and the daily reset,
//! say) can hand their snapshots to the hub in either order, but an
//! observer never sees an older write after a newer one.
//!
//! The membership map sits behind a [`RwLock`]: publishes take the read
//! side, joins and leaves take the write side, so churn never interleaves
//! with an iteration in progress.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tally_db::{CounterStore, StateChange, StoreError};
use tokio::sync::{RwLock, watch};
use tracing::debug;
use uuid::Uuid;

/// Identity of one connected observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(pub Uuid);

impl ObserverId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-observer slot: `None` until the first snapshot is offered.
type Slot = watch::Sender<Option<StateChange>>;

/// The receiving end handed to an observer's connection task.
#[derive(Debug)]
pub struct Subscription {
    id: ObserverId,
    rx: watch::Receiver<Option<StateChange>>,
}

impl Subscription {
    /// The identity this subscription is registered under.
    pub const fn id(&self) -> ObserverId {
        self.id
    }

    /// Wait for the next snapshot.
    ///
    /// Yields the join-time value first, then one value per publish that
    /// the observer kept up with. Returns `None` once the hub has dropped
    /// this observer.
    pub async fn next(&mut self) -> Option<StateChange> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(change) = *self.rx.borrow_and_update() {
                return Some(change);
            }
        }
    }

    /// The newest snapshot offered to this observer, without waiting.
    pub fn latest(&self) -> Option<StateChange> {
        *self.rx.borrow()
    }
}

/// Registry of live observers and fan-out point for committed writes.
pub struct BroadcastHub {
    store: Arc<CounterStore>,
    observers: RwLock<BTreeMap<ObserverId, Slot>>,
}

impl BroadcastHub {
    /// Create an empty hub that reads join-time values from `store`.
    pub fn new(store: Arc<CounterStore>) -> Self {
        Self {
            store,
            observers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Add an observer and offer it the current counter value.
    ///
    /// The observer is inserted before the store is read, so a write that
    /// commits while the read is in flight is either covered by the read
    /// or delivered by its own publish. Either way the first value the
    /// observer sees is never older than the store at join time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the join-time read fails; the observer is
    /// removed again before returning.
    pub async fn register(&self) -> Result<Subscription, StoreError> {
        let id = ObserverId::new();
        let (tx, rx) = watch::channel(None);
        self.observers.write().await.insert(id, tx);

        match self.store.read().await {
            Ok(current) => {
                if let Some(tx) = self.observers.read().await.get(&id) {
                    offer(tx, current);
                }
                debug!(observer = %id, value = current.value, "Observer registered");
                Ok(Subscription { id, rx })
            }
            Err(e) => {
                self.unregister(id).await;
                Err(e)
            }
        }
    }

    /// Remove an observer. Removing an unknown observer is a no-op.
    ///
    /// Returns whether the observer was present.
    pub async fn unregister(&self, id: ObserverId) -> bool {
        let removed = self.observers.write().await.remove(&id).is_some();
        if removed {
            debug!(observer = %id, "Observer unregistered");
        }
        removed
    }

    /// Offer `change` to every registered observer.
    ///
    /// Does not wait for any observer to consume it. Observers whose
    /// receiving end has gone away are evicted; the rest are unaffected.
    /// Returns the number of observers the snapshot was offered to.
    pub async fn publish(&self, change: StateChange) -> usize {
        let mut delivered: usize = 0;
        let mut failed = Vec::new();

        {
            let observers = self.observers.read().await;
            for (id, tx) in observers.iter() {
                if offer(tx, change) {
                    delivered = delivered.saturating_add(1);
                } else {
                    failed.push(*id);
                }
            }
        }

        for id in failed {
            debug!(observer = %id, "Evicting observer after failed delivery");
            self.unregister(id).await;
        }

        debug!(
            value = change.value,
            revision = change.revision,
            observers = delivered,
            "Published counter change"
        );
        delivered
    }

    /// Number of currently registered observers.
    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Whether `id` is currently registered.
    pub async fn is_registered(&self, id: ObserverId) -> bool {
        self.observers.read().await.contains_key(&id)
    }
}

/// Move `tx` forward to `change` unless it already holds something newer.
///
/// Returns `false` if the observer's receiver has been dropped.
fn offer(tx: &Slot, change: StateChange) -> bool {
    if tx.is_closed() {
        return false;
    }
    tx.send_if_modified(|slot| match slot {
        Some(current) if !change.supersedes(current) => false,
        _ => {
            *slot = Some(change);
            true
        }
    });
    true
}
