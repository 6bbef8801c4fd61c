//! Integration tests for the HTTP facade.
//!
//! The router is exercised in-process with `tower::ServiceExt::oneshot`
//! against a real `DispatchService` and `ConnectionManager` over the mock
//! transport, so every test covers the full request path: JSON envelope →
//! validation → manager → transport → response envelope.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use zap_core::ReconnectPolicy;
use zap_gateway::api::{build_router, ApiState};
use zap_gateway::application::{ConnectionManager, DispatchService};
use zap_gateway::infrastructure::pairing::PairingPresenter;
use zap_gateway::infrastructure::session::SessionStore;
use zap_gateway::infrastructure::transport::mock::MockDialer;
use zap_gateway::infrastructure::transport::TransportDialer;

const OPERATOR: &str = "5511999999999";

struct App {
    router: Router,
    manager: Arc<ConnectionManager>,
    dialer: Arc<MockDialer>,
    _dir: tempfile::TempDir,
}

/// Builds the full API stack over a mock transport.
fn app() -> App {
    let dir = tempfile::tempdir().expect("tempdir");
    let dialer = Arc::new(MockDialer::auto_opening());

    let manager = Arc::new(ConnectionManager::new(
        Arc::clone(&dialer) as Arc<dyn TransportDialer>,
        Arc::new(SessionStore::new(dir.path().join("session"))),
        Arc::new(PairingPresenter::new(dir.path().join("qrcode.png"))),
        ReconnectPolicy::new(Duration::from_secs(3)),
        Duration::from_secs(10),
        Duration::from_millis(500),
    ));

    let dispatch = Arc::new(DispatchService::new(Arc::clone(&manager), OPERATOR));
    let router = build_router(ApiState { dispatch });

    App {
        router,
        manager,
        dialer,
        _dir: dir,
    }
}

/// Same stack with the chat session already live.
async fn connected_app() -> App {
    let app = app();
    app.manager.connect().await.expect("connect");
    app
}

async fn post_json(router: Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");

    let response = router.oneshot(request).await.expect("oneshot");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let json = serde_json::from_slice(&bytes).expect("response is JSON");
    (status, json)
}

async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request");

    let response = router.oneshot(request).await.expect("oneshot");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let json = serde_json::from_slice(&bytes).expect("response is JSON");
    (status, json)
}

// ── POST /api/send-message ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_send_message_delivers_and_returns_success() {
    let app = connected_app().await;

    let (status, body) = post_json(
        app.router.clone(),
        "/api/send-message",
        r#"{"recipient": "5511988887777", "message": "Olá!"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"success": true}));

    // The recipient reached the transport normalized.
    let sent = app.dialer.transport().expect("transport").sent_messages();
    assert_eq!(
        sent,
        vec![(
            "5511988887777@s.whatsapp.net".to_string(),
            "Olá!".to_string()
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn test_send_message_accepts_a_full_jid_unchanged() {
    let app = connected_app().await;

    let (status, _body) = post_json(
        app.router.clone(),
        "/api/send-message",
        r#"{"recipient": "5511988887777@s.whatsapp.net", "message": "oi"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let sent = app.dialer.transport().expect("transport").sent_messages();
    assert_eq!(sent[0].0, "5511988887777@s.whatsapp.net");
}

#[tokio::test(start_paused = true)]
async fn test_send_message_missing_fields_is_a_bad_request() {
    let app = connected_app().await;

    let (status, body) = post_json(app.router.clone(), "/api/send-message", "{}").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], serde_json::json!(false));
    assert!(body["error"].is_string());

    // Nothing was sent for the rejected request.
    assert!(app
        .dialer
        .transport()
        .expect("transport")
        .sent_messages()
        .is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_send_message_missing_message_names_the_field() {
    let app = connected_app().await;

    let (status, body) = post_json(
        app.router.clone(),
        "/api/send-message",
        r#"{"recipient": "5511988887777"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], serde_json::json!("message is required"));
}

#[tokio::test(start_paused = true)]
async fn test_send_message_delivery_failure_returns_fixed_portuguese_error() {
    let app = connected_app().await;
    app.dialer
        .transport()
        .expect("transport")
        .fail_sends
        .store(true, Ordering::Relaxed);

    let (status, body) = post_json(
        app.router.clone(),
        "/api/send-message",
        r#"{"recipient": "5511988887777", "message": "oi"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        serde_json::json!({"success": false, "error": "erro ao enviar mensagem"})
    );
}

#[tokio::test(start_paused = true)]
async fn test_send_message_connects_on_demand_when_session_is_down() {
    // No prior connect(): the facade drives one before sending.
    let app = app();

    let (status, body) = post_json(
        app.router.clone(),
        "/api/send-message",
        r#"{"recipient": "5511988887777", "message": "oi"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"success": true}));
    assert!(app.manager.is_connected().await);
    assert_eq!(app.dialer.dials(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_send_message_when_connect_fails_returns_fixed_portuguese_error() {
    // The session is down and the chat gateway is unreachable.
    let app = app();
    app.dialer.fail_next_dial.store(true, Ordering::Relaxed);

    let (status, body) = post_json(
        app.router.clone(),
        "/api/send-message",
        r#"{"recipient": "5511988887777", "message": "oi"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], serde_json::json!("erro ao enviar mensagem"));
    assert!(!app.manager.is_connected().await);
}

// ── POST /api/send-booking-notification ───────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_booking_notification_formats_and_routes_to_the_operator() {
    let app = connected_app().await;

    let (status, body) = post_json(
        app.router.clone(),
        "/api/send-booking-notification",
        r#"{"clientName": "Ana Souza", "bookingDate": "2025-08-30 19:00", "total": 450.0}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"success": true}));

    let sent = app.dialer.transport().expect("transport").sent_messages();
    assert_eq!(sent.len(), 1);
    // Routed to the configured operator, normalized.
    assert_eq!(sent[0].0, format!("{OPERATOR}@s.whatsapp.net"));
    assert_eq!(
        sent[0].1,
        "Nova reserva confirmada!\n\nCliente: Ana Souza\nData: 2025-08-30 19:00\nTotal: R$ 450.00"
    );
}

#[tokio::test(start_paused = true)]
async fn test_booking_notification_missing_client_name_is_a_bad_request() {
    let app = connected_app().await;

    let (status, body) = post_json(
        app.router.clone(),
        "/api/send-booking-notification",
        r#"{"bookingDate": "2025-08-30", "total": 100.0}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], serde_json::json!("clientName is required"));
}

#[tokio::test(start_paused = true)]
async fn test_booking_notification_missing_total_is_a_bad_request() {
    let app = connected_app().await;

    let (status, body) = post_json(
        app.router.clone(),
        "/api/send-booking-notification",
        r#"{"clientName": "Ana", "bookingDate": "2025-08-30"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], serde_json::json!("total is required"));
}

// ── GET /api/connection-status ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_connection_status_reports_connected() {
    let app = connected_app().await;

    let (status, body) = get_json(app.router.clone(), "/api/connection-status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({"connected": true, "message": "WhatsApp conectado"})
    );
}

#[tokio::test(start_paused = true)]
async fn test_connection_status_reports_disconnected() {
    let app = app();

    let (status, body) = get_json(app.router.clone(), "/api/connection-status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({"connected": false, "message": "WhatsApp desconectado"})
    );
}
