//! WebSocket implementation of the chat transport.
//!
//! The gateway speaks JSON text frames to the chat network gateway over a
//! single WebSocket.  The socket library on the far side handles the actual
//! chat protocol, encryption, and multi-device session logic; this module
//! only maps frames to [`TransportEvent`]s and back.
//!
//! # Frame flow
//!
//! ```text
//! dial()                                  reader task
//!  ├─ connect_async(gateway_url)          ├─ "open"         → Opened
//!  ├─ send Restore{creds} (if persisted)  ├─ "qr"           → PairingRequired
//!  └─ spawn reader task                   ├─ "pair_success" → PairingResolved
//!                                         ├─ "creds"        → CredentialsRotated
//! send_text()                             └─ "closed"       → Closed(reason)
//!  └─ send Send{to, body}
//! ```
//!
//! The reader task owns the receive half and pushes decoded events into the
//! manager's mpsc channel; the send half lives behind an async mutex inside
//! [`WsTransport`] so `send_text` and `close` can share it.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, warn};
use uuid::Uuid;

use zap_core::state::DisconnectReason;
use zap_core::Jid;

use super::{ChatTransport, SessionCredentials, TransportDialer, TransportError, TransportEvent};

type WsSink = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<TcpStream>>,
    WsMessage,
>;
type WsSource = futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

// ── Wire frames ───────────────────────────────────────────────────────────────

/// Frames sent from the gateway process to the chat gateway.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame<'a> {
    /// Restore a previously persisted session instead of pairing anew.
    Restore { creds: &'a serde_json::Value },
    /// Deliver a text message.  `id` is a fresh UUID the far side echoes in
    /// delivery receipts.
    Send {
        id: Uuid,
        to: &'a str,
        body: &'a str,
    },
}

/// Frames received from the chat gateway.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GatewayFrame {
    /// Handshake complete.
    Open,
    /// Pairing challenge; `code` is the opaque token to render for scanning.
    Qr { code: String },
    /// The operator scanned the challenge.
    PairSuccess,
    /// Rotated session credentials to persist.
    Creds { creds: serde_json::Value },
    /// Orderly close with a reason string and library-specific code.
    Closed {
        reason: String,
        #[serde(default)]
        code: u16,
    },
}

/// Maps the gateway's close-reason string to a [`DisconnectReason`].
///
/// Unknown strings carry the numeric code through so operators can look the
/// failure up in the library's documentation.
fn parse_close_reason(reason: &str, code: u16) -> DisconnectReason {
    match reason {
        "logged_out" => DisconnectReason::LoggedOut,
        "timeout" => DisconnectReason::Timeout,
        "connection_lost" => DisconnectReason::ConnectionLost,
        "requested" => DisconnectReason::Requested,
        _ => DisconnectReason::Other(code),
    }
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// A live WebSocket connection to the chat gateway.
pub struct WsTransport {
    sink: Mutex<WsSink>,
}

#[async_trait]
impl ChatTransport for WsTransport {
    async fn send_text(&self, to: &Jid, body: &str) -> Result<(), TransportError> {
        let frame = ClientFrame::Send {
            id: Uuid::new_v4(),
            to: to.as_str(),
            body,
        };
        // Serializing a struct of strings cannot fail; treat a failure as an
        // I/O-class error rather than panicking.
        let json = serde_json::to_string(&frame).map_err(|e| TransportError::Io(e.to_string()))?;

        let mut sink = self.sink.lock().await;
        sink.send(WsMessage::Text(json))
            .await
            .map_err(map_ws_error)
    }

    async fn close(&self) {
        let mut sink = self.sink.lock().await;
        // A failed Close frame means the socket is already gone; either way
        // the connection is over.
        if let Err(e) = sink.send(WsMessage::Close(None)).await {
            debug!("close frame not delivered: {e}");
        }
    }
}

/// Maps tungstenite errors to the transport taxonomy.
fn map_ws_error(e: WsError) -> TransportError {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
        other => TransportError::Io(other.to_string()),
    }
}

// ── Dialer ────────────────────────────────────────────────────────────────────

/// Opens WebSocket connections to the configured chat gateway URL.
pub struct WsDialer {
    url: String,
}

impl WsDialer {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl TransportDialer for WsDialer {
    async fn dial(
        &self,
        credentials: Option<SessionCredentials>,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn ChatTransport>, TransportError> {
        let (stream, _response) = connect_async(&self.url)
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        debug!("websocket established to {}", self.url);

        let (mut sink, source) = stream.split();

        // Offer the persisted session before anything else so the far side
        // can skip pairing.  Absent credentials mean a fresh pairing flow;
        // the gateway will answer with a Qr frame.
        if let Some(creds) = &credentials {
            let frame = ClientFrame::Restore { creds: &creds.0 };
            let json =
                serde_json::to_string(&frame).map_err(|e| TransportError::Io(e.to_string()))?;
            sink.send(WsMessage::Text(json))
                .await
                .map_err(|e| TransportError::Handshake(e.to_string()))?;
        }

        tokio::spawn(read_gateway_frames(source, events));

        Ok(Arc::new(WsTransport {
            sink: Mutex::new(sink),
        }))
    }
}

/// Reads frames from the gateway and forwards them as [`TransportEvent`]s.
///
/// Runs until the socket closes.  An abrupt stream end (EOF or error without
/// an orderly `Closed` frame) is reported as `Closed(ConnectionLost)` so the
/// manager always observes exactly one close event per connection.
async fn read_gateway_frames(mut source: WsSource, events: mpsc::Sender<TransportEvent>) {
    let mut orderly_close = false;

    while let Some(item) = source.next().await {
        let msg = match item {
            Ok(msg) => msg,
            Err(WsError::ConnectionClosed | WsError::Protocol(_)) => break,
            Err(e) => {
                warn!("websocket read error: {e}");
                break;
            }
        };

        match msg {
            WsMessage::Text(json) => {
                let frame: GatewayFrame = match serde_json::from_str(&json) {
                    Ok(f) => f,
                    Err(e) => {
                        // One malformed frame is not worth killing the
                        // session over; skip it.
                        warn!("invalid frame from chat gateway: {e}");
                        continue;
                    }
                };

                let event = match frame {
                    GatewayFrame::Open => TransportEvent::Opened,
                    GatewayFrame::Qr { code } => TransportEvent::PairingRequired { challenge: code },
                    GatewayFrame::PairSuccess => TransportEvent::PairingResolved,
                    GatewayFrame::Creds { creds } => {
                        TransportEvent::CredentialsRotated(SessionCredentials(creds))
                    }
                    GatewayFrame::Closed { reason, code } => {
                        orderly_close = true;
                        TransportEvent::Closed(parse_close_reason(&reason, code))
                    }
                };

                let is_close = matches!(event, TransportEvent::Closed(_));
                if events.send(event).await.is_err() {
                    debug!("event channel closed; stopping gateway reader");
                    return;
                }
                if is_close {
                    break;
                }
            }
            WsMessage::Close(_) => break,
            // Protocol-level pings are answered by tungstenite itself.
            WsMessage::Ping(_) | WsMessage::Pong(_) => {}
            other => {
                debug!("ignoring unexpected websocket frame: {other:?}");
            }
        }
    }

    if !orderly_close {
        let _ = events
            .send(TransportEvent::Closed(DisconnectReason::ConnectionLost))
            .await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_reason_logged_out_maps_to_terminal_variant() {
        assert_eq!(
            parse_close_reason("logged_out", 401),
            DisconnectReason::LoggedOut
        );
    }

    #[test]
    fn test_close_reason_timeout_maps() {
        assert_eq!(parse_close_reason("timeout", 408), DisconnectReason::Timeout);
    }

    #[test]
    fn test_close_reason_connection_lost_maps() {
        assert_eq!(
            parse_close_reason("connection_lost", 0),
            DisconnectReason::ConnectionLost
        );
    }

    #[test]
    fn test_unknown_close_reason_carries_the_code() {
        assert_eq!(
            parse_close_reason("restart_required", 515),
            DisconnectReason::Other(515)
        );
    }

    #[test]
    fn test_send_frame_serializes_with_type_tag_and_id() {
        let frame = ClientFrame::Send {
            id: Uuid::new_v4(),
            to: "5511999999999@s.whatsapp.net",
            body: "Olá",
        };
        let json: serde_json::Value =
            serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "send");
        assert_eq!(json["to"], "5511999999999@s.whatsapp.net");
        assert_eq!(json["body"], "Olá");
        assert!(json["id"].is_string());
    }

    #[test]
    fn test_qr_frame_deserializes() {
        let frame: GatewayFrame =
            serde_json::from_str(r#"{"type":"qr","code":"2@abcDEF123"}"#).unwrap();
        assert_eq!(
            frame,
            GatewayFrame::Qr {
                code: "2@abcDEF123".to_string()
            }
        );
    }

    #[test]
    fn test_closed_frame_without_code_defaults_to_zero() {
        let frame: GatewayFrame =
            serde_json::from_str(r#"{"type":"closed","reason":"connection_lost"}"#).unwrap();
        assert_eq!(
            frame,
            GatewayFrame::Closed {
                reason: "connection_lost".to_string(),
                code: 0
            }
        );
    }

    #[test]
    fn test_creds_frame_carries_opaque_blob() {
        let frame: GatewayFrame = serde_json::from_str(
            r#"{"type":"creds","creds":{"noiseKey":"xyz","registered":true}}"#,
        )
        .unwrap();
        match frame {
            GatewayFrame::Creds { creds } => {
                assert_eq!(creds["registered"], serde_json::json!(true));
            }
            other => panic!("expected Creds, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_frame_is_a_parse_error() {
        let result: Result<GatewayFrame, _> = serde_json::from_str(r#"{"type":"unknown_kind"}"#);
        assert!(result.is_err());
    }
}
