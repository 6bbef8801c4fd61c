//! Domain layer: configuration types.

pub mod config;

pub use config::{ChatConfig, ConfigError, GatewayConfig, HttpConfig, NotifyConfig};
