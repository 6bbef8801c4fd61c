//! # zap-core
//!
//! Shared library for the zap gateway containing the connection state
//! machine, the reconnection policy, recipient addressing, and the epoch
//! counter used to discard stale async results.
//!
//! This crate is pure domain logic: it has zero dependencies on sockets,
//! async runtimes, or the filesystem, which keeps every rule in it unit
//! testable without spinning up a network.
//!
//! # Architecture overview
//!
//! The gateway maintains exactly one outbound session to the chat network.
//! Everything the session does is expressed here as data:
//!
//! - **`state`** – The lifecycle of that single session as an explicit
//!   `(state, event) → (next state, side effect)` transition table.  The
//!   gateway binary feeds network-library callbacks into this table instead
//!   of mutating a connection flag ad hoc.
//!
//! - **`policy`** – What to do when the socket closes unexpectedly: retry
//!   once after a fixed backoff, or give up because the user revoked access.
//!
//! - **`jid`** – Normalization of caller-supplied recipient identifiers into
//!   the chat network's addressing format.
//!
//! - **`epoch`** – A monotonically increasing generation counter.  Each
//!   explicit disconnect advances it, so results from an aborted connection
//!   attempt can be recognised and dropped.

pub mod epoch;
pub mod jid;
pub mod policy;
pub mod state;

// Re-export the most-used types at the crate root so callers can write
// `zap_core::ConnectionState` instead of `zap_core::state::ConnectionState`.
pub use epoch::EpochCounter;
pub use jid::{Jid, JidError};
pub use policy::{ReconnectDecision, ReconnectPolicy};
pub use state::{apply, ConnectionState, DisconnectReason, SessionEvent, Transition, TransitionEffect};
