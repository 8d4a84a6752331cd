use std::{net::SocketAddr, sync::Arc};

use quai_portfolio::{
    relay::{self, Relay},
    testing::MockUpstream,
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;

async fn start_relay(upstream: &MockUpstream) -> SocketAddr {
    let relay = Arc::new(Relay::new(upstream.explorer().unwrap(), upstream.rpc()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(relay::serve(listener, relay));
    addr
}

async fn post(addr: SocketAddr, body: &str) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/"))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

/// Tests that REST requests return the upstream body and keep upstream failures' status.
#[tokio::test]
async fn test_rest_relay() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.rest("/v2/stats", json!({"total_blocks": "100"}));
    upstream.rest_status("/v2/blocks", 503, json!({"message": "maintenance"}));
    let addr = start_relay(&upstream).await;

    let (status, body) = post(addr, r#"{"type":"rest","endpoint":"/v2/stats"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"total_blocks": "100"}));

    let (status, body) = post(addr, r#"{"type":"rest","endpoint":"/v2/blocks"}"#).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "API error: 503");
    assert!(body["details"].as_str().unwrap().contains("maintenance"));
}

/// Tests RPC results, RPC error objects and HTTP failures of the node.
#[tokio::test]
async fn test_rpc_relay() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.rpc_result("quai_blockNumber", json!("0x1b4"));
    upstream.rpc_error("quai_sendRawTransaction", -32000, "nonce too low");
    upstream.rpc_status("quai_gasPrice", 429);
    let addr = start_relay(&upstream).await;

    let (status, body) = post(addr, r#"{"type":"rpc","rpcMethod":"quai_blockNumber"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"result": "0x1b4"}));

    let (status, body) = post(
        addr,
        r#"{"type":"rpc","rpcMethod":"quai_sendRawTransaction","rpcParams":["0x02f8"]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "nonce too low", "code": -32000}));

    let (status, body) = post(addr, r#"{"type":"rpc","rpcMethod":"quai_gasPrice"}"#).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "RPC error: 429");
}

/// Tests rejection of invalid requests before any upstream call.
#[tokio::test]
async fn test_invalid_requests() {
    let upstream = MockUpstream::start().await.unwrap();
    let addr = start_relay(&upstream).await;

    let (status, body) = post(addr, r#"{"type":"ws"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request type. Use 'rest' or 'rpc'");

    let (status, _) = post(addr, "{").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(addr, r#"{"type":"rest","endpoint":"@evil.example/"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(upstream.total_hits(), 0);
}

/// Tests CORS headers on preflight and regular responses.
#[tokio::test]
async fn test_cors() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.rest("/v2/stats", json!({}));
    let addr = start_relay(&upstream).await;
    let client = reqwest::Client::new();

    let preflight = client
        .request(reqwest::Method::OPTIONS, format!("http://{addr}/"))
        .header("origin", "https://dashboard.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type, apikey")
        .send()
        .await
        .unwrap();
    assert!(preflight.status().is_success());
    let headers = preflight.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    let allowed = headers["access-control-allow-headers"].to_str().unwrap();
    assert!(allowed.contains("apikey"));
    assert!(allowed.contains("x-client-info"));

    let response = client
        .post(format!("http://{addr}/"))
        .header("origin", "https://dashboard.example")
        .body(r#"{"type":"rest","endpoint":"/v2/stats"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
