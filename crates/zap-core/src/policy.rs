//! Reconnection policy: what to do after an unexpected socket closure.
//!
//! The policy deliberately schedules **exactly one** retry per close event.
//! There is no retry loop and no attempt counter: each retry is triggered by
//! a fresh close event, so a persistently failing network rate-limits itself
//! to one attempt per close/connect cycle, and a test can pin the behaviour
//! down.

use std::time::Duration;

use crate::state::DisconnectReason;

/// Default delay before the single scheduled reconnect attempt.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);

/// What the connection manager should do about a closed socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Schedule one `connect()` call after the given delay.
    RetryAfter(Duration),
    /// Do not retry.  The close was terminal (logout) or locally requested.
    GiveUp,
}

/// Decides retry behaviour from the disconnect reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    backoff: Duration,
}

impl ReconnectPolicy {
    /// Creates a policy with a custom backoff (tests use short delays).
    pub fn new(backoff: Duration) -> Self {
        Self { backoff }
    }

    /// The configured delay before a scheduled retry.
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Maps a disconnect reason to a retry decision.
    ///
    /// A logout means the user revoked access: retrying would loop through a
    /// doomed handshake forever, so the policy gives up and leaves re-pairing
    /// to an operator.  A locally requested close is equally final from the
    /// policy's point of view.  Everything else gets one delayed attempt.
    pub fn decide(&self, reason: &DisconnectReason) -> ReconnectDecision {
        match reason {
            DisconnectReason::LoggedOut | DisconnectReason::Requested => ReconnectDecision::GiveUp,
            _ => ReconnectDecision::RetryAfter(self.backoff),
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
