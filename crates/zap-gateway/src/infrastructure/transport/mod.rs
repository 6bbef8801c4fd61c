//! The chat transport seam.
//!
//! The gateway delegates all protocol handling, encryption, and session
//! restoration to the socket library behind these traits.  The connection
//! manager never touches a socket directly: it asks a [`TransportDialer`]
//! for a connection, holds the returned [`ChatTransport`] handle, and reads
//! the library's callbacks as [`TransportEvent`]s from an mpsc channel.
//!
//! Two implementations exist:
//!
//! - [`ws::WsDialer`] – the real WebSocket connection to the chat gateway.
//! - [`mock::MockDialer`] – an in-memory recording implementation used by
//!   the lifecycle tests (no network, observable dial count and sends).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use zap_core::state::DisconnectReason;
use zap_core::Jid;

pub mod mock;
pub mod ws;

/// Error type for transport operations.
///
/// The variants exist so send failures stay distinguishable in logs
/// (auth-lost vs. timeout vs. malformed recipient) even though the manager
/// collapses them to a boolean at its boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The session credentials were rejected; re-pairing is required.
    #[error("authentication lost; re-pairing required")]
    AuthLost,

    /// The library gave up waiting for an acknowledgment.
    #[error("transport timed out")]
    Timeout,

    /// The network rejected the recipient address.
    #[error("malformed recipient: {0}")]
    MalformedRecipient(String),

    /// The initial socket/handshake setup failed.
    #[error("handshake with chat gateway failed: {0}")]
    Handshake(String),

    /// The socket is closed; no further sends are possible.
    #[error("transport is closed")]
    Closed,

    /// Any other socket-level failure.
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// Opaque session credential material, persisted between runs.
///
/// The blob's structure belongs to the socket library; the gateway only
/// round-trips it through serde and never inspects individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCredentials(pub serde_json::Value);

/// Events emitted by the transport to the connection manager.
///
/// These are the socket library's callbacks (connection-update,
/// creds-update) reframed as plain data on an mpsc channel, so the manager
/// can drive its state machine without registering closures.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The handshake completed; the session is live.
    Opened,
    /// No valid session exists; the operator must scan this challenge.
    PairingRequired { challenge: String },
    /// The operator scanned the challenge; the handshake resumes.
    PairingResolved,
    /// The library rotated the session credentials; persist them.
    CredentialsRotated(SessionCredentials),
    /// The socket closed.
    Closed(DisconnectReason),
}

/// A live connection to the chat network.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Delivers a text message to `to`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] describing the failure kind; the caller
    /// decides whether to surface or swallow it.
    async fn send_text(&self, to: &Jid, body: &str) -> Result<(), TransportError>;

    /// Closes the connection.  Idempotent; errors during close are ignored.
    async fn close(&self);
}

/// Opens connections to the chat network.
///
/// One `dial` call opens at most one socket.  The caller owns the invariant
/// that only one dial is in flight per process; the dialer does not enforce
/// it.
#[async_trait]
pub trait TransportDialer: Send + Sync {
    /// Opens a socket, optionally restoring a persisted session, and streams
    /// connection events into `events`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Handshake`] (or an I/O variant) when the
    /// socket cannot be established at all.  Failures after setup are
    /// reported through the event channel instead.
    async fn dial(
        &self,
        credentials: Option<SessionCredentials>,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn ChatTransport>, TransportError>;
}
