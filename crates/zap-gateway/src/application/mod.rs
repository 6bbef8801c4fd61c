//! Application layer: use cases built on top of the infrastructure seams.
//!
//! - [`manager`] – the connection lifecycle owner.
//! - [`dispatch`] – input validation, templating, and error folding for the
//!   HTTP facade.

pub mod dispatch;
pub mod manager;

pub use dispatch::{ConnectionStatus, DispatchError, DispatchService};
pub use manager::{ConnectionManager, ManagerError};
