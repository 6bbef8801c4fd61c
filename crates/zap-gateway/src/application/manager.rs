//! Connection manager: owns the single chat-network session.
//!
//! This is the only component allowed to mutate the connection state.  It
//! drives the pure transition table in `zap_core::state` with events from
//! the transport, executes the returned effects (render pairing challenge,
//! persist credentials, schedule a retry, tear down), and exposes a small
//! API to the dispatch layer: `connect`, `disconnect`, `send_message`,
//! `is_connected`.
//!
//! # Concurrency model
//!
//! - All mutable state (`ConnectionState` + the live transport handle) sits
//!   behind one `tokio::sync::Mutex`.  The lock is held only for state
//!   reads/writes, never across network awaits.
//! - Each connection attempt advances the epoch counter and tags its event
//!   pump with that epoch.  `disconnect()` advances the counter again, so a
//!   pump belonging to an aborted attempt sees a stale epoch and drops its
//!   events instead of resurrecting the state machine.
//! - A `connect()` call that finds an attempt already in flight does not
//!   dial a second socket: it polls the state until the attempt settles or a
//!   bounded wait expires.  At most one socket exists at any time.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use zap_core::{
    apply, ConnectionState, DisconnectReason, EpochCounter, Jid, JidError, ReconnectDecision,
    ReconnectPolicy, SessionEvent, TransitionEffect,
};

use crate::infrastructure::pairing::PairingPresenter;
use crate::infrastructure::session::{SessionError, SessionStore};
use crate::infrastructure::transport::{
    ChatTransport, TransportDialer, TransportError, TransportEvent,
};

/// Capacity of the per-attempt transport event channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Error type for connection manager operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The recipient identifier could not be normalized.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(#[from] JidError),

    /// The message body is empty.
    #[error("message body must not be empty")]
    InvalidMessage,

    /// No live connection exists; the send cannot be attempted.
    #[error("no live connection to the chat network")]
    NotConnected,

    /// The dial itself failed; no socket was established.
    #[error("connection attempt failed: {0}")]
    Connection(#[from] TransportError),

    /// The persisted session could not be read or written.
    #[error("session store error: {0}")]
    Session(#[from] SessionError),

    /// The bounded wait for an in-flight attempt expired.
    #[error("timed out waiting for the connection to come up")]
    ConnectTimeout,

    /// `disconnect()` superseded this attempt before it completed.
    #[error("connection attempt aborted by disconnect")]
    Aborted,
}

/// State guarded by the manager's single lock.
struct Inner {
    state: ConnectionState,
    transport: Option<Arc<dyn ChatTransport>>,
}

/// Owns the lifecycle of the single outbound chat session.
pub struct ConnectionManager {
    dialer: Arc<dyn TransportDialer>,
    session_store: Arc<SessionStore>,
    presenter: Arc<PairingPresenter>,
    policy: ReconnectPolicy,
    connect_wait: Duration,
    connect_poll: Duration,
    epoch: EpochCounter,
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    pub fn new(
        dialer: Arc<dyn TransportDialer>,
        session_store: Arc<SessionStore>,
        presenter: Arc<PairingPresenter>,
        policy: ReconnectPolicy,
        connect_wait: Duration,
        connect_poll: Duration,
    ) -> Self {
        Self {
            dialer,
            session_store,
            presenter,
            policy,
            connect_wait,
            connect_poll,
            epoch: EpochCounter::new(),
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                transport: None,
            }),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// Whether the session is live and able to send.
    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// Establishes the chat session, or waits for the attempt already in
    /// flight.
    ///
    /// Idempotent when already connected.  When another caller is mid-dial
    /// (or pairing is pending), this call does not open a second socket: it
    /// waits up to the configured bound for that attempt to settle.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ConnectTimeout`] when the bounded wait
    /// expires, [`ManagerError::Connection`] when the dial fails, and
    /// [`ManagerError::Aborted`] when `disconnect()` supersedes the attempt.
    pub async fn connect(self: &Arc<Self>) -> Result<(), ManagerError> {
        // Decide under the lock whether this call owns a fresh dial or joins
        // an attempt already in flight.  Applying DialStarted here, before
        // the lock drops, is what makes a concurrent second caller observe
        // Connecting and take the wait path.
        let attempt = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                ConnectionState::Connected => return Ok(()),
                state if state.is_in_progress() || state == ConnectionState::Closing => {
                    drop(inner);
                    return self.wait_for_connected().await;
                }
                _ => {
                    let transition = apply(inner.state, &SessionEvent::DialStarted);
                    inner.state = transition.next;
                    self.epoch.advance()
                }
            }
        };

        info!("connecting to the chat network");

        let credentials = match self.session_store.load() {
            Ok(creds) => creds,
            Err(e) => {
                self.settle_failed_attempt(attempt).await;
                return Err(e.into());
            }
        };

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let transport = match self.dialer.dial(credentials, tx).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!("dial failed: {e}");
                self.settle_failed_attempt(attempt).await;
                return Err(e.into());
            }
        };

        {
            let mut inner = self.inner.lock().await;
            if !self.epoch.is_current(attempt) {
                // disconnect() won the race while we were dialing.  The
                // socket must not outlive the abort.
                drop(inner);
                transport.close().await;
                return Err(ManagerError::Aborted);
            }
            inner.transport = Some(Arc::clone(&transport));
        }

        tokio::spawn(Arc::clone(self).run_event_pump(attempt, rx));

        self.wait_for_connected().await
    }

    /// Closes the session and invalidates any in-flight attempt.
    ///
    /// Idempotent: calling it while already disconnected is a no-op.  The
    /// epoch advance makes every pump and scheduled retry belonging to
    /// earlier attempts stale, so nothing reconnects behind our back.
    pub async fn disconnect(&self) {
        self.epoch.advance();

        let transport = {
            let mut inner = self.inner.lock().await;
            if inner.state == ConnectionState::Disconnected {
                return;
            }
            let transition = apply(inner.state, &SessionEvent::CloseRequested);
            inner.state = transition.next;
            inner.transport.take()
        };

        if let Some(transport) = transport {
            transport.close().await;
        }

        let mut inner = self.inner.lock().await;
        inner.state = ConnectionState::Disconnected;
        info!("disconnected from the chat network");
    }

    /// Sends a text message to `recipient`.
    ///
    /// Delivery failures collapse to `Ok(false)` at this boundary; the
    /// failure kind (auth lost, timeout, malformed recipient) stays visible
    /// in the logs.  Precondition failures — bad input, no connection — are
    /// real errors and come back as `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidMessage`] for an empty body,
    /// [`ManagerError::InvalidRecipient`] when normalization fails, and
    /// [`ManagerError::NotConnected`] when no live session exists.
    pub async fn send_message(&self, recipient: &str, text: &str) -> Result<bool, ManagerError> {
        if text.trim().is_empty() {
            return Err(ManagerError::InvalidMessage);
        }
        let jid = Jid::normalize(recipient)?;

        let transport = {
            let inner = self.inner.lock().await;
            if inner.state != ConnectionState::Connected {
                return Err(ManagerError::NotConnected);
            }
            match &inner.transport {
                Some(transport) => Arc::clone(transport),
                None => return Err(ManagerError::NotConnected),
            }
        };

        match transport.send_text(&jid, text).await {
            Ok(()) => {
                debug!(recipient = %jid, "message delivered");
                Ok(true)
            }
            Err(e) => {
                warn!(recipient = %jid, "message delivery failed: {e}");
                Ok(false)
            }
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// Polls the state until the in-flight attempt settles.
    ///
    /// Resolution is `connect_poll`; the total wait is bounded by
    /// `connect_wait`.  Settling at `Disconnected` means the attempt failed.
    async fn wait_for_connected(&self) -> Result<(), ManagerError> {
        let mut waited = Duration::ZERO;
        loop {
            match self.state().await {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Disconnected => return Err(ManagerError::NotConnected),
                _ => {}
            }
            if waited >= self.connect_wait {
                return Err(ManagerError::ConnectTimeout);
            }
            tokio::time::sleep(self.connect_poll).await;
            waited += self.connect_poll;
        }
    }

    /// Returns the state to `Disconnected` after a dial that never produced
    /// a socket, unless a newer attempt or a disconnect took over meanwhile.
    async fn settle_failed_attempt(&self, attempt: u64) {
        let mut inner = self.inner.lock().await;
        if self.epoch.is_current(attempt) {
            inner.state = ConnectionState::Disconnected;
        }
    }

    /// Applies one lifecycle event under the lock and returns the effect.
    async fn apply_event(&self, event: SessionEvent) -> TransitionEffect {
        let mut inner = self.inner.lock().await;
        let transition = apply(inner.state, &event);
        if transition.next != inner.state {
            info!(from = %inner.state, to = %transition.next, "connection state changed");
        }
        inner.state = transition.next;
        transition.effect
    }

    /// Consumes transport events for one connection attempt.
    ///
    /// Runs until the transport closes or the attempt's epoch goes stale.
    /// Stale events are dropped unprocessed: they describe a socket that
    /// `disconnect()` already abandoned.
    async fn run_event_pump(
        self: Arc<Self>,
        attempt: u64,
        mut events: mpsc::Receiver<TransportEvent>,
    ) {
        while let Some(event) = events.recv().await {
            if !self.epoch.is_current(attempt) {
                debug!("dropping event from superseded connection attempt");
                break;
            }

            match event {
                TransportEvent::Opened => {
                    self.apply_event(SessionEvent::HandshakeComplete).await;
                    info!("chat session is live");
                }
                TransportEvent::PairingRequired { challenge } => {
                    let effect = self.apply_event(SessionEvent::PairingRequired).await;
                    if effect == TransitionEffect::PresentPairing {
                        // Rendering failure is non-fatal: the session keeps
                        // waiting and the next challenge re-renders.
                        if let Err(e) = self.presenter.present(&challenge) {
                            warn!("could not render pairing challenge: {e}");
                        } else {
                            info!(
                                "pairing required; scan the code at {}",
                                self.presenter.output_path().display()
                            );
                        }
                    }
                }
                TransportEvent::PairingResolved => {
                    self.apply_event(SessionEvent::PairingScanned).await;
                    info!("pairing challenge scanned; resuming handshake");
                }
                TransportEvent::CredentialsRotated(creds) => {
                    if let Err(e) = self.session_store.save(&creds) {
                        error!("failed to persist rotated session credentials: {e}");
                    }
                }
                TransportEvent::Closed(reason) => {
                    self.handle_close(attempt, reason).await;
                    break;
                }
            }
        }
    }

    /// Handles the transport's close event: records the transition, drops
    /// the transport handle, and executes the close effect.
    async fn handle_close(self: &Arc<Self>, attempt: u64, reason: DisconnectReason) {
        warn!(?reason, "chat session closed");

        let effect = {
            let mut inner = self.inner.lock().await;
            let transition = apply(inner.state, &SessionEvent::SocketClosed(reason));
            inner.state = transition.next;
            inner.transport = None;
            transition.effect
        };

        match effect {
            TransitionEffect::ClearSession => {
                info!("logged out; clearing persisted session (operator must re-pair)");
                if let Err(e) = self.session_store.clear() {
                    error!("failed to clear session credentials: {e}");
                }
            }
            TransitionEffect::ScheduleReconnect => match self.policy.decide(&reason) {
                ReconnectDecision::RetryAfter(delay) => {
                    info!(?delay, "scheduling one reconnect attempt");
                    tokio::spawn(Arc::clone(self).run_scheduled_reconnect(attempt, delay));
                }
                ReconnectDecision::GiveUp => {
                    info!("not reconnecting for this close reason");
                }
            },
            _ => {}
        }
    }

    /// `connect` behind a concrete boxed future type.  The scheduled
    /// reconnect awaits this instead of `connect`'s opaque future, breaking
    /// the `connect` → pump → reconnect → `connect` type cycle that
    /// otherwise prevents the compiler from proving `Send`.
    fn connect_boxed(
        self: &Arc<Self>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), ManagerError>> + Send + '_>>
    {
        Box::pin(self.connect())
    }

    /// One delayed reconnect attempt, cancelled if the epoch moved on.
    async fn run_scheduled_reconnect(self: Arc<Self>, attempt: u64, delay: Duration) {
        tokio::time::sleep(delay).await;

        if !self.epoch.is_current(attempt) {
            debug!("scheduled reconnect superseded; skipping");
            return;
        }
        if self.state().await != ConnectionState::Disconnected {
            return;
        }

        match self.connect_boxed().await {
            Ok(()) => info!("scheduled reconnect succeeded"),
            Err(e) => warn!("scheduled reconnect failed: {e}"),
        }
    }
}
