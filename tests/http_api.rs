//! End-to-end tests for the HTTP surface over a real socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};
use user_service::http::HttpServer;
use user_service::lifecycle::Shutdown;

mod common;

/// Spawn `server` on an ephemeral port. Keep the returned `Shutdown` alive
/// for as long as the server should run.
async fn spawn(server: HttpServer) -> (SocketAddr, Shutdown) {
    let (listener, addr) = common::ephemeral_listener().await;
    let shutdown = Shutdown::new();
    tokio::spawn(server.run(listener, shutdown.subscribe()));
    (addr, shutdown)
}

#[tokio::test]
async fn test_healthz_reports_ok() {
    let (addr, _shutdown) = spawn(common::seeded_server()).await;

    let res = common::client()
        .get(format!("http://{addr}/healthz"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_healthz_does_not_wait_on_storage() {
    let repo = Arc::new(common::SlowUserRepository::new(Duration::from_secs(2)));
    let (addr, _shutdown) = spawn(common::server_with(repo.clone())).await;
    let client = common::client();

    let slow = {
        let client = client.clone();
        tokio::spawn(async move { client.get(format!("http://{addr}/users/u1")).send().await })
    };
    while repo.started() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let res = tokio::time::timeout(
        Duration::from_millis(500),
        client.get(format!("http://{addr}/healthz")).send(),
    )
    .await
    .expect("health check blocked behind a storage call")
    .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    slow.abort();
}

#[tokio::test]
async fn test_get_user_found() {
    let (addr, _shutdown) = spawn(common::seeded_server()).await;

    let res = common::client()
        .get(format!("http://{addr}/users/u1"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "id": "u1", "name": "Alice" }));
}

#[tokio::test]
async fn test_get_missing_user_is_server_error() {
    let (addr, _shutdown) = spawn(common::seeded_server()).await;

    let res = common::client()
        .get(format!("http://{addr}/users/u2"))
        .send()
        .await
        .unwrap();

    assert!(res.status().is_server_error());
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "user not found: u2");
}

#[tokio::test]
async fn test_get_user_storage_failure() {
    let (addr, _shutdown) = spawn(common::server_with(Arc::new(common::FailingUserRepository))).await;

    let res = common::client()
        .get(format!("http://{addr}/users/u1"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.text().await.unwrap();
    assert!(body.contains("connection refused"), "unexpected body: {body}");
}

#[tokio::test]
async fn test_create_then_get_user() {
    let (addr, _shutdown) = spawn(common::seeded_server()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{addr}/users"))
        .json(&json!({ "id": "u7", "name": "Grace" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .get(format!("http://{addr}/users/u7"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "id": "u7", "name": "Grace" }));
}

#[tokio::test]
async fn test_create_duplicate_user_conflicts() {
    let (addr, _shutdown) = spawn(common::seeded_server()).await;

    let res = common::client()
        .post(format!("http://{addr}/users"))
        .json(&json!({ "id": "u1", "name": "Again" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(res.text().await.unwrap(), "user already exists: u1");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (addr, _shutdown) = spawn(common::seeded_server()).await;

    let res = common::client()
        .get(format!("http://{addr}/nope"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (addr, _shutdown) = spawn(common::seeded_server()).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/healthz"))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "abc-123");

    let res = client
        .get(format!("http://{addr}/healthz"))
        .send()
        .await
        .unwrap();
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_metrics_exposes_request_counters() {
    let (addr, _shutdown) = spawn(common::seeded_server()).await;
    let client = common::client();

    client
        .get(format!("http://{addr}/users/u1"))
        .send()
        .await
        .unwrap();

    let res = client
        .get(format!("http://{addr}/metrics"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let body = res.text().await.unwrap();
    assert!(body.contains("http_requests_total"), "missing counter:\n{body}");
    assert!(body.contains("route=\"/users/{id}\""), "missing route label:\n{body}");
}
