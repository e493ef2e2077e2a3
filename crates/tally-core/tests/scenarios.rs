//! End-to-end counter scenarios through the gateway and hub.
//!
//! These run against the in-memory and file backends, so no external
//! services are needed.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::arithmetic_side_effects,
    clippy::missing_panics_doc,
    clippy::panic
)]

use std::sync::Arc;
use std::time::Duration;

use tally_core::error::TallyError;
use tally_core::gateway::UpdateGateway;
use tally_core::hub::{ObserverId, Subscription};
use tally_db::{CounterStore, FileStore, MemoryStore};

fn memory_gateway(value: i64) -> UpdateGateway {
    UpdateGateway::new(Arc::new(CounterStore::from(MemoryStore::with_value(value))))
}

fn set_offline(gateway: &UpdateGateway, offline: bool) {
    let CounterStore::Memory(memory) = gateway.store().as_ref() else {
        panic!("not a memory store");
    };
    memory.set_offline(offline);
}

async fn next_value(sub: &mut Subscription) -> i64 {
    tokio::time::timeout(Duration::from_secs(1), sub.next())
        .await
        .expect("observer was not pushed a value")
        .expect("observer was dropped")
        .value
}

#[tokio::test]
async fn uninitialized_store_walkthrough() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("counter.json"))
        .await
        .unwrap();
    let gateway = UpdateGateway::new(Arc::new(CounterStore::from(store)));

    assert_eq!(gateway.current_value().await.unwrap(), 0);

    let mut observer = gateway.subscribe().await.unwrap();
    let mut pushed = vec![next_value(&mut observer).await];

    assert_eq!(gateway.increment().await.unwrap(), 1);
    pushed.push(next_value(&mut observer).await);
    assert_eq!(gateway.increment().await.unwrap(), 2);
    pushed.push(next_value(&mut observer).await);
    assert_eq!(gateway.decrement().await.unwrap(), 1);
    pushed.push(next_value(&mut observer).await);
    assert_eq!(gateway.reset().await.unwrap().value, 0);
    pushed.push(next_value(&mut observer).await);

    assert_eq!(pushed, vec![0, 1, 2, 1, 0]);
}

#[tokio::test]
async fn concurrent_increments_are_not_lost() {
    let gateway = memory_gateway(5);

    let (a, b) = tokio::join!(gateway.increment(), gateway.increment());
    let mut results = [a.unwrap(), b.unwrap()];
    results.sort_unstable();

    assert_eq!(results, [6, 7]);
    assert_eq!(gateway.current_value().await.unwrap(), 7);
}

#[tokio::test]
async fn many_concurrent_clients() {
    let gateway = memory_gateway(0);

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                if i % 4 == 0 {
                    gateway.decrement().await
                } else {
                    gateway.increment().await
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // 75 increments, 25 decrements.
    assert_eq!(gateway.current_value().await.unwrap(), 50);
}

#[tokio::test]
async fn failed_write_is_reported_and_not_broadcast() {
    let gateway = memory_gateway(3);
    let mut observer = gateway.subscribe().await.unwrap();
    assert_eq!(next_value(&mut observer).await, 3);

    set_offline(&gateway, true);
    let err = gateway.increment().await.unwrap_err();
    assert!(matches!(err, TallyError::StorageUnavailable { .. }));

    set_offline(&gateway, false);
    assert_eq!(gateway.current_value().await.unwrap(), 3);
    assert_eq!(observer.latest().unwrap().value, 3);
}

#[tokio::test]
async fn late_joiner_sees_current_value_first() {
    let gateway = memory_gateway(0);
    for _ in 0..4 {
        gateway.increment().await.unwrap();
    }

    let mut observer = gateway.subscribe().await.unwrap();
    assert_eq!(next_value(&mut observer).await, 4);
}

#[tokio::test]
async fn every_observer_receives_the_write() {
    let gateway = memory_gateway(10);
    let mut observers = Vec::new();
    for _ in 0..8 {
        let mut sub = gateway.subscribe().await.unwrap();
        assert_eq!(next_value(&mut sub).await, 10);
        observers.push(sub);
    }

    gateway.decrement().await.unwrap();

    for sub in &mut observers {
        assert_eq!(next_value(sub).await, 9);
    }
}

#[tokio::test]
async fn disconnected_observer_does_not_block_others() {
    let gateway = memory_gateway(0);
    let gone = gateway.subscribe().await.unwrap();
    let mut kept = gateway.subscribe().await.unwrap();
    next_value(&mut kept).await;
    drop(gone);

    assert_eq!(gateway.increment().await.unwrap(), 1);
    assert_eq!(next_value(&mut kept).await, 1);
    assert_eq!(gateway.hub().observer_count().await, 1);
}

#[tokio::test]
async fn unregister_is_idempotent() {
    let gateway = memory_gateway(0);
    let sub = gateway.subscribe().await.unwrap();
    let mut other = gateway.subscribe().await.unwrap();
    assert_eq!(next_value(&mut other).await, 0);
    let hub = gateway.hub();

    assert!(hub.unregister(sub.id()).await);
    assert!(!hub.unregister(sub.id()).await);
    assert!(!hub.unregister(ObserverId::new()).await);
    assert_eq!(hub.observer_count().await, 1);

    // The remaining observer is untouched.
    assert_eq!(gateway.increment().await.unwrap(), 1);
    assert_eq!(next_value(&mut other).await, 1);
}

#[tokio::test]
async fn reset_racing_increment_settles_by_store_order() {
    let gateway = memory_gateway(10);
    let mut observer = gateway.subscribe().await.unwrap();
    next_value(&mut observer).await;

    let (reset, inc) = tokio::join!(gateway.reset(), gateway.increment());
    let reset = reset.unwrap();
    let inc = inc.unwrap();

    let stored = gateway.store().read().await.unwrap();
    if stored.revision == reset.revision {
        assert_eq!(stored.value, 0);
    } else {
        assert_eq!(stored.value, inc);
        assert_eq!(inc, 1);
    }

    // The observer settles on whatever the store settled on.
    let last = observer.latest().unwrap();
    assert_eq!(last, stored);
}
