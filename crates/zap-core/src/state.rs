//! Connection lifecycle state machine for the single chat-network session.
//!
//! The gateway owns exactly one outbound session.  Its lifecycle is:
//!
//! ```text
//! Disconnected ──dial started──► Connecting
//! Connecting ──pairing required──► AwaitingPairing
//! AwaitingPairing ──scan completed──► Connecting
//! Connecting ──handshake ok──► Connected
//! Connected ──socket closed, logged out──► Disconnected  (terminal, no retry)
//! Connected ──socket closed, other reason──► Disconnected (+ scheduled retry)
//! any state ──close requested──► Closing ──► Disconnected
//! ```
//!
//! Rather than mutating a flag from scattered callbacks, every transition is
//! expressed through the pure [`apply`] function: a table mapping
//! `(current state, event)` to `(next state, side effect)`.  The gateway's
//! connection manager feeds network-library events into this table and
//! executes the returned effect; nothing else may decide a transition.
//!
//! The distinction between a logged-out close and any other close is a
//! safety property: "user revoked access" must never be treated like a
//! transient network blip, so the table returns [`TransitionEffect::ClearSession`]
//! for the former and [`TransitionEffect::ScheduleReconnect`] for the latter.

use serde::Serialize;

/// Current state of the single outbound chat session.
///
/// Exactly one instance exists per process.  Transitions are driven only by
/// [`apply`]; no other component mutates the state directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No socket exists.  A `connect()` call may start a new attempt.
    Disconnected,
    /// A socket is being opened and the handshake is in progress.
    Connecting,
    /// The network issued a pairing challenge; an operator must scan it.
    AwaitingPairing,
    /// The handshake completed; messages can be sent.
    Connected,
    /// An explicit close is in progress.  Transient; settles to `Disconnected`.
    Closing,
}

impl ConnectionState {
    /// Returns `true` while a connection attempt is in flight.
    ///
    /// A second `connect()` caller must wait on states for which this returns
    /// `true` instead of dialing a duplicate socket.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Connecting | Self::AwaitingPairing)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingPairing => "awaiting_pairing",
            Self::Connected => "connected",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Why the socket closed, as reported by the network library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The account was logged out on another device or access was revoked.
    /// Terminal: the persisted session is invalid and must not be reused.
    LoggedOut,
    /// The transport dropped without an orderly close.
    ConnectionLost,
    /// The library gave up waiting for the remote end.
    Timeout,
    /// The close was requested locally via `disconnect()`.
    Requested,
    /// An unmapped library-specific close code.
    Other(u16),
}

impl DisconnectReason {
    /// Returns `true` for the logout-class close that must never auto-retry.
    pub fn is_logged_out(&self) -> bool {
        matches!(self, Self::LoggedOut)
    }
}

/// Named events that drive lifecycle transitions.
///
/// These are the network library's callbacks and the manager's explicit API
/// calls, reframed as data so the transition table stays independent of any
/// particular callback mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new socket is being opened.
    DialStarted,
    /// The network issued a pairing challenge (no valid session exists).
    PairingRequired,
    /// The operator scanned the pairing challenge; the handshake resumes.
    PairingScanned,
    /// The handshake completed and the session is live.
    HandshakeComplete,
    /// The socket closed with the given reason.
    SocketClosed(DisconnectReason),
    /// `disconnect()` was called locally.
    CloseRequested,
}

/// Side effect the caller must execute after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Nothing to do beyond recording the new state.
    None,
    /// Render the pairing challenge for the operator.
    PresentPairing,
    /// Consult the reconnection policy and schedule at most one retry.
    ScheduleReconnect,
    /// Wipe the persisted session credentials; they are no longer valid.
    ClearSession,
    /// Close the underlying transport.
    TearDown,
}

/// Result of applying an event to a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: ConnectionState,
    pub effect: TransitionEffect,
}

impl Transition {
    fn new(next: ConnectionState, effect: TransitionEffect) -> Self {
        Self { next, effect }
    }

    /// A transition that keeps the current state and does nothing.
    fn stay(current: ConnectionState) -> Self {
        Self::new(current, TransitionEffect::None)
    }
}

/// Applies `event` to `current`, returning the next state and side effect.
///
/// Events that do not apply to the current state leave it unchanged with
/// [`TransitionEffect::None`].  This is what makes stale callbacks harmless:
/// a late `HandshakeComplete` arriving after an abort finds the machine in
/// `Disconnected` and bounces off.
pub fn apply(current: ConnectionState, event: &SessionEvent) -> Transition {
    use ConnectionState::*;
    use TransitionEffect::*;

    match (current, event) {
        // A dial may only start from the idle state.  While an attempt is in
        // flight, a second dial request is a no-op (the caller waits).
        (Disconnected, SessionEvent::DialStarted) => Transition::new(Connecting, None),

        (Connecting, SessionEvent::PairingRequired) => {
            Transition::new(AwaitingPairing, PresentPairing)
        }
        (AwaitingPairing, SessionEvent::PairingScanned) => Transition::new(Connecting, None),

        // Some library versions report the handshake directly from the
        // pairing state without an intermediate "scanned" notification, so
        // both in-flight states accept completion.
        (Connecting | AwaitingPairing, SessionEvent::HandshakeComplete) => {
            Transition::new(Connected, None)
        }

        // Socket closure from any live state settles to Disconnected.  The
        // effect depends on the reason: logout invalidates the session,
        // a locally requested close needs nothing further, and everything
        // else is a candidate for one scheduled retry.
        (Connecting | AwaitingPairing | Connected, SessionEvent::SocketClosed(reason)) => {
            let effect = match reason {
                DisconnectReason::LoggedOut => ClearSession,
                DisconnectReason::Requested => None,
                _ => ScheduleReconnect,
            };
            Transition::new(Disconnected, effect)
        }
        (Closing, SessionEvent::SocketClosed(_)) => Transition::new(Disconnected, None),

        // Explicit disconnect aborts whatever is in progress.  From the idle
        // state it is a no-op so the operation stays idempotent.
        (Disconnected, SessionEvent::CloseRequested) => Transition::stay(Disconnected),
        (_, SessionEvent::CloseRequested) => Transition::new(Closing, TearDown),

        // Everything else is a stale or out-of-order event.
        _ => Transition::stay(current),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
