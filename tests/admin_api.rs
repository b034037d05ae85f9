//! Admin API over a real listener.

use reqwest::StatusCode;
use tokio::net::TcpListener;

use chat_relay::admin::{setup_admin_router, AdminState};
use chat_relay::config::SchedulerConfig;

mod common;
use common::Harness;

const KEY: &str = "test-admin-key";

async fn spawn_admin(h: &Harness) -> (String, chat_relay::ProcessingLoop) {
    let processing = h.processing_loop(SchedulerConfig {
        initial_delay_ms: 60_000,
        ..SchedulerConfig::default()
    });
    let router = setup_admin_router(AdminState {
        processing: processing.clone(),
        api_key: KEY.into(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), processing)
}

#[tokio::test]
async fn test_requests_without_key_are_rejected() {
    let h = Harness::new(10, 3);
    let (base, _processing) = spawn_admin(&h).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{base}/admin/status")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(format!("{base}/admin/loop/start"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_and_conversations() {
    let h = Harness::new(10, 3);
    h.user_says("chat-b", "hi");
    h.user_says("chat-a", "hello");
    let (base, _processing) = spawn_admin(&h).await;
    let client = reqwest::Client::new();

    let status: serde_json::Value = client
        .get(format!("{base}/admin/status"))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["conversations"], 2);
    assert_eq!(status["scheduler"]["active"], false);
    assert_eq!(status["scheduler"]["consecutive_errors"], 0);
    assert_eq!(status["scheduler"]["circuit_breaker"]["open"], false);

    let conversations: serde_json::Value = client
        .get(format!("{base}/admin/conversations"))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(conversations[0]["id"], "chat-a");
    assert_eq!(conversations[0]["due"], true);
    assert_eq!(conversations[1]["id"], "chat-b");
    assert_eq!(conversations[1]["messages"], 1);
}

#[tokio::test]
async fn test_start_and_stop_loop() {
    let h = Harness::new(10, 3);
    let (base, processing) = spawn_admin(&h).await;
    let client = reqwest::Client::new();

    let started: serde_json::Value = client
        .post(format!("{base}/admin/loop/start"))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(started["changed"], true);
    assert_eq!(started["active"], true);
    assert!(processing.is_active());

    let again: serde_json::Value = client
        .post(format!("{base}/admin/loop/start"))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again["changed"], false);

    let stopped: serde_json::Value = client
        .post(format!("{base}/admin/loop/stop"))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stopped["changed"], true);
    assert_eq!(stopped["active"], false);
    assert!(!processing.is_active());
}
