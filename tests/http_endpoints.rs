//! Scrape and probe endpoints served by the metrics server.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use kbot::bot::Command;
use kbot::http::HttpServer;
use kbot::observability::{MessageStatus, MetricsRecorder};
use tower::ServiceExt;

mod common;

use common::TEST_VERSION;

fn server() -> (HttpServer, Arc<MetricsRecorder>) {
    let metrics = Arc::new(MetricsRecorder::new(TEST_VERSION).unwrap());
    (
        HttpServer::new(metrics.clone(), Duration::from_secs(5)),
        metrics,
    )
}

async fn get(server: &HttpServer, path: &str) -> (StatusCode, Option<String>, String) {
    let response = server
        .router()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _) = server();
    let (status, _, body) = get(&server, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_ready_endpoint() {
    let (server, _) = server();
    let (status, _, body) = get(&server, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ready");
}

#[tokio::test]
async fn test_metrics_exposition() {
    let (server, metrics) = server();
    metrics.record_message(Command::Hello, MessageStatus::Success, Duration::from_millis(3));
    metrics.record_message(Command::Time, MessageStatus::Error, Duration::from_millis(40));

    let (status, content_type, body) = get(&server, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        content_type.as_deref(),
        Some(kbot::http::server::EXPOSITION_CONTENT_TYPE)
    );
    assert!(body.contains("# TYPE kbot_messages_total counter"));
    assert!(body.contains(r#"kbot_messages_total{command="hello",status="success"} 1"#));
    assert!(body.contains(r#"kbot_messages_total{command="time",status="error"} 1"#));
    assert!(body.contains("kbot_message_processing_duration_seconds_bucket"));
    assert!(body.contains("kbot_start_time_seconds"));
    assert!(body.contains(&format!(r#"kbot_info{{version="{TEST_VERSION}"}} 1"#)));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let (server, _) = server();
    let (status, _, _) = get(&server, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_served_over_tcp_until_shutdown() {
    let (server, _) = server();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = kbot::Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let body = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server stops after shutdown")
        .unwrap()
        .unwrap();
}
