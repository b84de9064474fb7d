use serde_json::{Value, json};
use std::sync::Arc;

use pico_rpc::rpc::{RpcServer, register_default_handlers};
use pico_rpc::transport::HttpTransport;

// End-to-end: real socket, real HTTP client.
async fn spawn_server() -> String {
    let server = Arc::new(RpcServer::new());
    register_default_handlers(&server).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = HttpTransport::new(server).router();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}/", addr)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping_over_http() {
    let url = spawn_server().await;

    let resp: Value = reqwest::Client::new()
        .post(&url)
        .json(&json!({"jsonrpc": "2.0", "method": "ping", "params": {}, "id": 1}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(resp["result"], "pong");
    assert_eq!(resp["id"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_discovery_over_http() {
    let url = spawn_server().await;

    let smd: Value = reqwest::get(&url).await.unwrap().json().await.unwrap();

    assert_eq!(smd["SMDVersion"], "2.0");
    assert!(smd["services"].get("ping").is_some());
    assert!(smd["services"].get("sum").is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_new_token_returns_uuid() {
    let url = spawn_server().await;

    let resp: Value = reqwest::Client::new()
        .post(&url)
        .json(&json!({"jsonrpc": "2.0", "method": "new_token", "params": {}, "id": 2}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let token = resp["result"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(token).is_ok());
}
