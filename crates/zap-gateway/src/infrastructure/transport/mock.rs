//! Mock chat transport for unit and integration testing.
//!
//! # Why a mock transport?
//!
//! The real transport opens a WebSocket to the chat network, which a test
//! cannot do deterministically.  The `MockDialer`/`MockTransport` pair
//! replaces all network I/O with in-memory recording:
//!
//! - Every dial is counted, so tests can assert the at-most-one-socket
//!   invariant directly.
//! - Every sent message is pushed into a `Mutex<Vec<...>>` for inspection.
//! - Tests drive the lifecycle by injecting [`TransportEvent`]s through the
//!   captured event sender, exactly as the socket library would.
//!
//! # `fail_next_dial` / `fail_sends` flags
//!
//! Set these before calling into the manager to exercise error-handling
//! paths without a broken network.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use zap_core::Jid;

use super::{ChatTransport, SessionCredentials, TransportDialer, TransportError, TransportEvent};

/// A transport that records sends instead of performing network I/O.
#[derive(Default)]
pub struct MockTransport {
    /// Records each (recipient, body) pair passed to `send_text`.
    pub sent: Mutex<Vec<(String, String)>>,
    /// When `true`, every send returns `TransportError::Timeout`.
    pub fail_sends: AtomicBool,
    /// Set once `close` has been called.
    pub closed: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far.
    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("mock lock poisoned").clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_text(&self, to: &Jid, body: &str) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(TransportError::Timeout);
        }
        self.sent
            .lock()
            .expect("mock lock poisoned")
            .push((to.as_str().to_string(), body.to_string()));
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

/// A dialer that hands out [`MockTransport`]s and captures the event sender.
#[derive(Default)]
pub struct MockDialer {
    /// Number of `dial` calls made so far.
    pub dial_count: AtomicUsize,
    /// When `true`, the next dial fails with an I/O error (and resets the flag).
    pub fail_next_dial: AtomicBool,
    /// When `true`, every dial immediately emits `Opened` (happy-path tests).
    pub auto_open: AtomicBool,
    /// Credentials passed to the most recent dial.
    pub last_credentials: Mutex<Option<SessionCredentials>>,
    /// The transport created by the most recent dial.
    transport: Mutex<Option<Arc<MockTransport>>>,
    /// Event sender captured from the most recent dial, for test injection.
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

impl MockDialer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dialer whose connections come up immediately.
    pub fn auto_opening() -> Self {
        let dialer = Self::default();
        dialer.auto_open.store(true, Ordering::Relaxed);
        dialer
    }

    pub fn dials(&self) -> usize {
        self.dial_count.load(Ordering::Relaxed)
    }

    /// The transport from the most recent dial, if any.
    pub fn transport(&self) -> Option<Arc<MockTransport>> {
        self.transport.lock().expect("mock lock poisoned").clone()
    }

    /// The event sender from the most recent dial, if any.
    ///
    /// Tests use this to inject library events (pairing, closes) into the
    /// manager's pump.
    pub fn event_sender(&self) -> Option<mpsc::Sender<TransportEvent>> {
        self.events.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl TransportDialer for MockDialer {
    async fn dial(
        &self,
        credentials: Option<SessionCredentials>,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn ChatTransport>, TransportError> {
        self.dial_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_credentials
            .lock()
            .expect("mock lock poisoned") = credentials;

        if self.fail_next_dial.swap(false, Ordering::Relaxed) {
            return Err(TransportError::Io("mock dial failure".to_string()));
        }

        let transport = Arc::new(MockTransport::new());
        *self.transport.lock().expect("mock lock poisoned") = Some(Arc::clone(&transport));

        if self.auto_open.load(Ordering::Relaxed) {
            let _ = events.send(TransportEvent::Opened).await;
        }
        *self.events.lock().expect("mock lock poisoned") = Some(events);

        Ok(transport)
    }
}
