//! HTTP facade over the dispatch service.
//!
//! Three endpoints, mirroring what the booking application calls:
//!
//! - `POST /api/send-message`               – free-form text to any recipient.
//! - `POST /api/send-booking-notification`  – templated message to the operator.
//! - `GET  /api/connection-status`          – connection snapshot for monitoring.
//!
//! Every POST answers with the same `{ "success": bool, "error"?: string }`
//! envelope: 200 on delivery, 400 for caller mistakes, 500 for delivery
//! failures.  Request fields are individually defaulted so a missing field
//! reaches the validation layer (which answers 400) instead of bouncing off
//! the deserializer.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::application::{ConnectionStatus, DispatchError, DispatchService};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub dispatch: Arc<DispatchService>,
}

/// Builds the gateway's HTTP router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/send-message", post(send_message))
        .route("/api/send-booking-notification", post(send_booking_notification))
        .route("/api/connection-status", get(connection_status))
        .with_state(state)
}

// ── Request / response envelopes ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    #[serde(default)]
    recipient: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookingNotificationRequest {
    #[serde(default)]
    client_name: String,
    #[serde(default)]
    booking_date: String,
    #[serde(default)]
    total: Option<f64>,
}

/// Uniform response envelope for the send endpoints.
#[derive(Debug, Serialize)]
struct SendResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SendResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Folds a dispatch outcome into `(status, envelope)`.
fn into_response(result: Result<(), DispatchError>) -> (StatusCode, Json<SendResponse>) {
    match result {
        Ok(()) => (StatusCode::OK, Json(SendResponse::ok())),
        Err(e @ DispatchError::InvalidRequest(_)) => {
            (StatusCode::BAD_REQUEST, Json(SendResponse::failure(e.to_string())))
        }
        Err(e @ DispatchError::SendFailed) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SendResponse::failure(e.to_string())),
        ),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn send_message(
    State(state): State<ApiState>,
    Json(req): Json<SendMessageRequest>,
) -> (StatusCode, Json<SendResponse>) {
    into_response(state.dispatch.send_text(&req.recipient, &req.message).await)
}

async fn send_booking_notification(
    State(state): State<ApiState>,
    Json(req): Json<BookingNotificationRequest>,
) -> (StatusCode, Json<SendResponse>) {
    let Some(total) = req.total else {
        return into_response(Err(DispatchError::InvalidRequest(
            "total is required".to_string(),
        )));
    };

    into_response(
        state
            .dispatch
            .send_booking_notification(&req.client_name, &req.booking_date, total)
            .await,
    )
}

async fn connection_status(State(state): State<ApiState>) -> Json<ConnectionStatus> {
    Json(state.dispatch.status().await)
}
