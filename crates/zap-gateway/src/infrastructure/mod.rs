//! Infrastructure layer: chat transport, session persistence, pairing artifact.

pub mod pairing;
pub mod session;
pub mod transport;
