// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SDK operations against a mocked gateway.

use std::time::Duration;

use kvgate_sdk::kvgate_client::ClientConfig;
use kvgate_sdk::{KvGateSdk, SdkConfig, SdkError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn sdk_for(server: &MockServer) -> KvGateSdk {
    let client = ClientConfig::new(server.uri())
        .with_api_key("secret")
        .with_request_timeout(Duration::from_secs(2));
    KvGateSdk::new(SdkConfig::new("worker-1").with_client(client)).unwrap()
}

#[tokio::test]
async fn test_acquire_uses_hsetnx() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/hashes/hsetnx"))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(json!({
            "key": "session:phone:5511",
            "field": "sessionLock",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sdk = sdk_for(&mock_server).await;
    assert!(sdk.acquire_session("5511").await.unwrap());
}

#[tokio::test]
async fn test_gateway_error_is_not_lock_refusal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/hashes/hsetnx"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    let sdk = sdk_for(&mock_server).await;
    let err = sdk.acquire_session("5511").await.unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(err, SdkError::Transport(_)));
}

#[tokio::test]
async fn test_malformed_reply_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/hashes/hsetnx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": "maybe"})))
        .mount(&mock_server)
        .await;

    let sdk = sdk_for(&mock_server).await;
    let err = sdk.acquire_session("5511").await.unwrap_err();
    assert!(matches!(err, SdkError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_release_checks_owner_before_delete() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/hashes/hget"))
        .and(body_partial_json(json!({"key": "session:phone:5511"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": "worker-2:1700000000000"})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/hashes/hdel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let sdk = sdk_for(&mock_server).await;
    assert!(!sdk.release_session("5511").await.unwrap());
}

#[tokio::test]
async fn test_audit_dead_queries_closed_range() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/sortedSets/zrangebyscore"))
        .and(body_partial_json(json!({
            "key": "agent:health:agents",
            "min": 0.0,
            "withScores": false,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["w1", "w3"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sdk = sdk_for(&mock_server).await;
    let dead = sdk
        .liveness()
        .audit_dead("agents", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(dead, vec!["w1", "w3"]);
}

#[tokio::test]
async fn test_signal_upserts_with_epoch_seconds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/sortedSets/zadd"))
        .and(body_partial_json(json!({"key": "agent:health:agents"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/hashes/hdel"))
        .and(body_partial_json(json!({"key": "agent:health-ttl:agents", "field": "worker-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 0})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sdk = sdk_for(&mock_server).await;
    sdk.signal("agents").await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let score = body["members"][0]["score"].as_f64().unwrap();
    assert_eq!(score.fract(), 0.0);
    assert_eq!(body["members"][0]["member"], "worker-1");
}

#[tokio::test]
async fn test_cleanup_is_two_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/sortedSets/zrem"))
        .and(body_partial_json(json!({
            "key": "agent:health:agents",
            "members": ["w1", "w2", "w3"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 3})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/pipelining/exec"))
        .and(body_partial_json(json!({
            "commands": [{"command": "hdel", "args": ["agent:health-ttl:agents", "w1", "w2", "w3"]}],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/hashes/hgetall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let sdk = sdk_for(&mock_server).await;
    let workers: Vec<String> = ["w1", "w2", "w3"].iter().map(|w| w.to_string()).collect();
    sdk.liveness().cleanup("agents", &workers).await.unwrap();
}

#[tokio::test]
async fn test_cleanup_of_nothing_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 0})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let sdk = sdk_for(&mock_server).await;
    sdk.liveness().cleanup("agents", &[]).await.unwrap();
}

#[tokio::test]
async fn test_unreachable_gateway() {
    let client = ClientConfig::new("http://127.0.0.1:9").with_request_timeout(Duration::from_secs(2));
    let sdk = KvGateSdk::new(SdkConfig::new("worker-1").with_client(client)).unwrap();

    let err = sdk.liveness().health_stats("agents").await.unwrap_err();
    assert!(err.is_transport());
}
