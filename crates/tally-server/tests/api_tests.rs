//! Integration tests for the Tally HTTP endpoints.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt`
//! without starting a TCP server.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tally_core::gateway::UpdateGateway;
use tally_db::{CounterStore, MemoryStore};
use tally_server::{AppState, build_router};
use tower::ServiceExt;

fn make_state(value: i64) -> Arc<AppState> {
    let store = Arc::new(CounterStore::from(MemoryStore::with_value(value)));
    Arc::new(AppState::new(UpdateGateway::new(store)))
}

fn set_offline(state: &AppState, offline: bool) {
    let CounterStore::Memory(memory) = state.gateway.store().as_ref() else {
        panic!("not a memory store");
    };
    memory.set_offline(offline);
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn call(state: &Arc<AppState>, method: Method, uri: &str) -> (StatusCode, Body) {
    let app = build_router(Arc::clone(state));
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    (response.status(), response.into_body())
}

#[tokio::test]
async fn count_returns_current_value() {
    let state = make_state(41);
    let (status, body) = call(&state, Method::GET, "/count").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body_to_json(body).await, serde_json::json!({ "value": 41 }));
}

#[tokio::test]
async fn increment_and_decrement() {
    let state = make_state(0);

    let (status, body) = call(&state, Method::POST, "/increment").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body_to_json(body).await["value"], 1);

    let (_, body) = call(&state, Method::POST, "/increment").await;
    assert_eq!(body_to_json(body).await["value"], 2);

    let (status, body) = call(&state, Method::POST, "/decrement").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body_to_json(body).await["value"], 1);

    let (_, body) = call(&state, Method::GET, "/count").await;
    assert_eq!(body_to_json(body).await["value"], 1);
}

#[tokio::test]
async fn increment_reaches_observer() {
    let state = make_state(5);
    let mut observer = state.gateway.subscribe().await.unwrap();
    assert_eq!(observer.next().await.unwrap().value, 5);

    call(&state, Method::POST, "/increment").await;

    assert_eq!(observer.next().await.unwrap().value, 6);
}

#[tokio::test]
async fn concurrent_increments_from_five() {
    let state = make_state(5);

    let (a, b) = tokio::join!(
        call(&state, Method::POST, "/increment"),
        call(&state, Method::POST, "/increment"),
    );
    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);

    let (_, body) = call(&state, Method::GET, "/count").await;
    assert_eq!(body_to_json(body).await["value"], 7);
}

#[tokio::test]
async fn store_outage_is_503() {
    let state = make_state(2);
    let mut observer = state.gateway.subscribe().await.unwrap();
    observer.next().await.unwrap();
    set_offline(&state, true);

    for (method, uri) in [
        (Method::GET, "/count"),
        (Method::POST, "/increment"),
        (Method::POST, "/decrement"),
    ] {
        let (status, body) = call(&state, method, uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
        let json = body_to_json(body).await;
        assert_eq!(json["status"], 503);
        assert!(json["error"].as_str().unwrap().contains("storage unavailable"));
    }

    set_offline(&state, false);
    let (_, body) = call(&state, Method::GET, "/count").await;
    assert_eq!(body_to_json(body).await["value"], 2);
    assert_eq!(observer.latest().unwrap().value, 2);
}

#[tokio::test]
async fn health_is_ok_during_outage() {
    let state = make_state(0);
    set_offline(&state, true);

    let (status, body) = call(&state, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let json = body_to_json(body).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["backend"], "memory");
    assert_eq!(json["observers"], 0);
}

#[tokio::test]
async fn index_serves_counter_page() {
    let state = make_state(0);
    let (status, body) = call(&state, Method::GET, "/").await;

    assert_eq!(status, StatusCode::OK);
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("<title>Tally</title>"));
    assert!(html.contains("/ws"));
}

#[tokio::test]
async fn increment_requires_post() {
    let state = make_state(0);
    let (status, _) = call(&state, Method::GET, "/increment").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (_, body) = call(&state, Method::GET, "/count").await;
    assert_eq!(body_to_json(body).await["value"], 0);
}

#[tokio::test]
async fn ws_route_requires_upgrade() {
    let state = make_state(0);
    let (status, _) = call(&state, Method::GET, "/ws").await;
    assert!(status.is_client_error());
    assert_ne!(status, StatusCode::NOT_FOUND);
    assert_eq!(state.gateway.hub().observer_count().await, 0);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let state = make_state(0);
    let (status, _) = call(&state, Method::GET, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
