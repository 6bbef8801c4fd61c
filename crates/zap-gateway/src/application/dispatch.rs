//! Message dispatch facade: the surface the HTTP API talks to.
//!
//! The facade validates caller input, formats the booking-notification
//! template, and maps every manager outcome into exactly two caller-visible
//! failure classes: bad request (the caller can fix it) and send failure
//! (the caller cannot).  The user-visible send-failure text is deliberately
//! a single fixed Portuguese string; the precise cause stays in the logs.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use super::manager::{ConnectionManager, ManagerError};

/// User-visible text for any delivery failure.
const SEND_FAILURE_TEXT: &str = "erro ao enviar mensagem";

/// Error type for dispatch operations, split along HTTP status lines.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request is malformed; the caller must fix it (HTTP 400).
    #[error("{0}")]
    InvalidRequest(String),

    /// The message could not be delivered (HTTP 500).  Always presents the
    /// fixed Portuguese text; the cause is logged, not surfaced.
    #[error("{SEND_FAILURE_TEXT}")]
    SendFailed,
}

/// Snapshot returned by the connection-status endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub message: String,
}

/// Validates, formats, and routes outbound messages through the manager.
pub struct DispatchService {
    manager: Arc<ConnectionManager>,
    operator_jid: String,
}

impl DispatchService {
    pub fn new(manager: Arc<ConnectionManager>, operator_jid: impl Into<String>) -> Self {
        Self {
            manager,
            operator_jid: operator_jid.into(),
        }
    }

    /// Sends a free-form text message to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidRequest`] for empty or malformed
    /// input and [`DispatchError::SendFailed`] for anything that stops the
    /// message from going out.
    pub async fn send_text(&self, recipient: &str, message: &str) -> Result<(), DispatchError> {
        if recipient.trim().is_empty() {
            return Err(DispatchError::InvalidRequest(
                "recipient is required".to_string(),
            ));
        }
        if message.trim().is_empty() {
            return Err(DispatchError::InvalidRequest(
                "message is required".to_string(),
            ));
        }

        self.deliver(recipient, message).await
    }

    /// Formats and sends a booking confirmation to the configured operator.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidRequest`] when a required field is
    /// missing and [`DispatchError::SendFailed`] on delivery failure.
    pub async fn send_booking_notification(
        &self,
        client_name: &str,
        booking_date: &str,
        total: f64,
    ) -> Result<(), DispatchError> {
        if client_name.trim().is_empty() {
            return Err(DispatchError::InvalidRequest(
                "clientName is required".to_string(),
            ));
        }
        if booking_date.trim().is_empty() {
            return Err(DispatchError::InvalidRequest(
                "bookingDate is required".to_string(),
            ));
        }
        if !total.is_finite() || total < 0.0 {
            return Err(DispatchError::InvalidRequest(
                "total must be a non-negative number".to_string(),
            ));
        }

        let message = format_booking_message(client_name, booking_date, total);
        self.deliver(&self.operator_jid, &message).await
    }

    /// Connection status for the monitoring endpoint.
    pub async fn status(&self) -> ConnectionStatus {
        let connected = self.manager.is_connected().await;
        let message = if connected {
            "WhatsApp conectado".to_string()
        } else {
            "WhatsApp desconectado".to_string()
        };
        ConnectionStatus { connected, message }
    }

    /// Runs one send through the manager and folds the outcome into the
    /// dispatch error taxonomy.
    ///
    /// Connects on demand: a send arriving while the session is down first
    /// drives `connect()` (bounded wait included) instead of failing
    /// outright.
    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), DispatchError> {
        if !self.manager.is_connected().await {
            if let Err(e) = self.manager.connect().await {
                warn!("on-demand connect failed: {e}");
                return Err(DispatchError::SendFailed);
            }
        }

        match self.manager.send_message(recipient, message).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DispatchError::SendFailed),
            Err(e @ (ManagerError::InvalidRecipient(_) | ManagerError::InvalidMessage)) => {
                Err(DispatchError::InvalidRequest(e.to_string()))
            }
            Err(e) => {
                // NotConnected and friends: the caller sees the fixed text,
                // the logs keep the real cause.
                warn!("dispatch failed: {e}");
                Err(DispatchError::SendFailed)
            }
        }
    }
}

/// Renders the fixed booking-notification template.
fn format_booking_message(client_name: &str, booking_date: &str, total: f64) -> String {
    format!(
        "Nova reserva confirmada!\n\nCliente: {client_name}\nData: {booking_date}\nTotal: R$ {total:.2}"
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_template_contains_all_fields() {
        let msg = format_booking_message("Ana Souza", "2025-08-30 19:00", 450.0);
        assert_eq!(
            msg,
            "Nova reserva confirmada!\n\nCliente: Ana Souza\nData: 2025-08-30 19:00\nTotal: R$ 450.00"
        );
    }

    #[test]
    fn test_booking_template_formats_total_with_two_decimals() {
        let msg = format_booking_message("Bruno", "2025-09-01", 99.9);
        assert!(msg.ends_with("Total: R$ 99.90"));
    }

    #[test]
    fn test_send_failure_text_is_fixed() {
        assert_eq!(DispatchError::SendFailed.to_string(), "erro ao enviar mensagem");
    }
}
