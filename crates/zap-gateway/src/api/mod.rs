//! Inbound API surface of the gateway.

pub mod http;

pub use http::{build_router, ApiState};
