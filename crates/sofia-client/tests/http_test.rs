//! HTTP collaborator tests against a local endpoint.

#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use reqwest::Url;
use sofia_client::{
    ConnectionDetailResolver, HttpResolver, RecordingAction, RecordingControl, RecordingError,
    ResolveError,
};
use sofia_core::{ConnectionDetailsRequest, RequestId};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

/// Serve one canned response per connection and record request lines.
async fn serve(status: u16, body: &'static str) -> (Url, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let requests = Arc::new(Mutex::new(Vec::new()));

    let seen = Arc::clone(&requests);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let head = String::from_utf8_lossy(&buf[..n]);
            if let Some(line) = head.lines().next() {
                seen.lock().expect("lock").push(line.to_string());
            }

            let response = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.ok();
            socket.shutdown().await.ok();
        }
    });

    (Url::parse(&format!("http://{addr}/")).expect("url"), requests)
}

fn request() -> ConnectionDetailsRequest {
    ConnectionDetailsRequest {
        id: RequestId(1),
        room_name: "r1".to_string(),
        participant_name: "Ana".to_string(),
        region: None,
    }
}

#[tokio::test]
async fn resolver_decodes_connection_details() {
    let (base, requests) =
        serve(200, r#"{"serverUrl":"wss://x","participantToken":"t","roomName":"r1"}"#).await;
    let resolver = HttpResolver::new(base.join("api/connection-details").expect("join"));

    let details = resolver.resolve(&request()).await.expect("resolve");
    assert_eq!(details.server_url, "wss://x");
    assert_eq!(details.participant_token, "t");
    assert_eq!(details.room_name, "r1");

    let lines = requests.lock().expect("lock").clone();
    assert_eq!(lines, vec![
        "GET /api/connection-details?roomName=r1&participantName=Ana HTTP/1.1".to_string()
    ]);
}

#[tokio::test]
async fn resolver_reports_error_status() {
    let (base, _) = serve(503, r#"{"error":"busy"}"#).await;
    let resolver = HttpResolver::new(base.join("api/connection-details").expect("join"));

    let result = resolver.resolve(&request()).await;
    assert!(matches!(result, Err(ResolveError::Status { status: 503, .. })));
}

#[tokio::test]
async fn resolver_reports_malformed_body() {
    let (base, _) = serve(200, r#"{"serverUrl":"wss://x"}"#).await;
    let resolver = HttpResolver::new(base.join("api/connection-details").expect("join"));

    let result = resolver.resolve(&request()).await;
    assert!(matches!(result, Err(ResolveError::Request(_))));
}

#[tokio::test]
async fn recording_start_is_accepted() {
    let (base, requests) = serve(200, "{}").await;
    let mut control = RecordingControl::new(base.join("api/record").expect("join"));

    let started = control.toggle("r1", false).await.expect("toggle");
    assert!(started);
    assert!(control.is_processing());

    control.observe(true);
    assert!(control.is_recording());
    assert!(!control.is_processing());

    let lines = requests.lock().expect("lock").clone();
    assert_eq!(lines, vec!["GET /api/record/start?roomName=r1 HTTP/1.1".to_string()]);
}

#[tokio::test]
async fn rejected_recording_request_reverts() {
    let (base, _) = serve(500, "{}").await;
    let mut control = RecordingControl::new(base.join("api/record").expect("join"));

    let result = control.request(RecordingAction::Start, "r1", false).await;
    assert!(matches!(result, Err(RecordingError::Rejected { status: 500 })));
    assert!(!control.is_processing());
    assert!(!control.is_recording());
}

#[tokio::test]
async fn second_request_while_processing_is_refused() {
    let (base, _) = serve(200, "{}").await;
    let mut control = RecordingControl::new(base.join("api/record").expect("join"));

    control.request(RecordingAction::Start, "r1", false).await.expect("start");
    let result = control.request(RecordingAction::Stop, "r1", false).await;
    assert!(matches!(result, Err(RecordingError::InProgress)));
}
