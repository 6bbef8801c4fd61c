//! # zap-gateway
//!
//! The runnable notification gateway: it owns the single outbound session to
//! the chat network and exposes a small HTTP facade the booking back office
//! calls to deliver messages.
//!
//! # Layers
//!
//! - **`domain`** – Configuration types (TOML-backed), no I/O of their own.
//! - **`infrastructure`** – The chat transport (WebSocket), session
//!   credential persistence, and the pairing QR presenter.
//! - **`application`** – The connection manager (lifecycle owner) and the
//!   message dispatch facade the HTTP layer delegates to.
//! - **`api`** – The axum router with the three public endpoints.
//!
//! All lifecycle rules (state machine, reconnect policy, addressing) live in
//! the `zap-core` crate; this crate wires them to real sockets and files.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
