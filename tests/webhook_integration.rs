//! Webhook delivery integration tests
//!
//! Exercises `ReqwestSink` and `WebhookDispatcher` against a `wiremock`
//! server standing in for a Discord-style webhook.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use butterbot::config::NotifierConfig;
use butterbot::notify::{NotificationSink, NotifierRegistry, ReqwestSink, WebhookDispatcher};
use butterbot::ButterbotError;

fn notifier(name: &str, url: String) -> NotifierConfig {
    NotifierConfig {
        kind: "discord".to_string(),
        name: name.to_string(),
        url,
        content_type: "application/json".to_string(),
        status_code: 204,
    }
}

fn dispatcher() -> WebhookDispatcher {
    WebhookDispatcher::new(Arc::new(
        ReqwestSink::new(Duration::from_secs(5)).expect("client should build"),
    ))
}

#[tokio::test]
async fn test_sink_returns_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad payload"))
        .mount(&server)
        .await;

    let sink = ReqwestSink::new(Duration::from_secs(5)).unwrap();
    let response = sink
        .post(
            &format!("{}/hook", server.uri()),
            "application/json",
            "{}".to_string(),
        )
        .await
        .expect("a response was received");

    assert_eq!(response.status, 400);
    assert_eq!(response.body, "bad payload");
}

#[tokio::test]
async fn test_sink_unreachable_is_delivery_error() {
    let sink = ReqwestSink::new(Duration::from_secs(2)).unwrap();
    let result = sink
        .post("http://127.0.0.1:1/hook", "application/json", "{}".to_string())
        .await;

    assert!(matches!(result, Err(ButterbotError::Delivery(_))));
}

#[tokio::test]
async fn test_dispatch_posts_content_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ops"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({ "content": "website is down" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    dispatcher()
        .dispatch(&notifier("ops", format!("{}/ops", server.uri())), "website is down")
        .await
        .expect("delivery should succeed");
}

#[tokio::test]
async fn test_rejected_delivery_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher()
        .dispatch(&notifier("ops", format!("{}/ops", server.uri())), "hello")
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_fan_out_skips_unknown_and_survives_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dev"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let registry = NotifierRegistry::new(vec![
        notifier("ops", "http://127.0.0.1:1/ops".to_string()),
        notifier("dev", format!("{}/dev", server.uri())),
    ]);
    let names = vec!["ops".to_string(), "ghost".to_string(), "dev".to_string()];

    let sent = dispatcher().notify(&registry, &names, "orders is up").await;

    assert_eq!(sent, 1);
}
