//! Generation counter for discarding stale async results.
//!
//! The connection manager spawns tasks per connection attempt: an event pump
//! and, after an unexpected close, one delayed reconnect.  An explicit
//! `disconnect()` must abort all of them, but Tokio tasks cannot be torn out
//! of an in-flight await.  Instead, each task captures the epoch value at
//! spawn time and re-checks it before acting; `disconnect()` advances the
//! counter, so anything captured earlier observes a mismatch and drops its
//! result.
//!
//! The counter uses `AtomicU64`, so concurrent reads and advances need no
//! lock.  `Ordering::Relaxed` suffices: the epoch only gates staleness
//! decisions, it is not used to synchronise other memory.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing generation counter.
///
/// Starts at 0.  [`advance`](Self::advance) is called on every explicit
/// disconnect; tasks snapshot [`current`](Self::current) when spawned and
/// compare later via [`is_current`](Self::is_current).
#[derive(Debug, Default)]
pub struct EpochCounter {
    inner: AtomicU64,
}

impl EpochCounter {
    /// Creates a counter at generation 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidates all previously snapshotted generations and returns the
    /// new one.  Wraps at `u64::MAX` without panicking.
    pub fn advance(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// The current generation.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }

    /// Whether a snapshotted generation is still the live one.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.current() == epoch
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
