//! TOML-based configuration for the gateway.
//!
//! The config file is the only operator-editable surface.  Every field has a
//! per-field serde default so the gateway works on first run (before a file
//! exists) and keeps working when upgrading from an older file that lacks
//! newer fields.  Example:
//!
//! ```toml
//! [gateway]
//! log_level = "info"
//!
//! [http]
//! bind_addr = "0.0.0.0:3001"
//!
//! [chat]
//! gateway_url = "wss://gateway.example.net/ws"
//! session_dir = "./session"
//! qr_path = "./qrcode.png"
//! reconnect_backoff_secs = 3
//!
//! [notify]
//! operator_jid = "5511999999999"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level gateway configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub gateway: GeneralConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// General behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// HTTP facade settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpConfig {
    /// Address and port the HTTP API binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

/// Chat-network connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    /// WebSocket URL of the chat network gateway.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// Directory holding the persisted session credentials.
    #[serde(default = "default_session_dir")]
    pub session_dir: PathBuf,
    /// Where the pairing QR code image is written for the operator.
    #[serde(default = "default_qr_path")]
    pub qr_path: PathBuf,
    /// Delay before the single scheduled reconnect attempt, in seconds.
    #[serde(default = "default_reconnect_backoff_secs")]
    pub reconnect_backoff_secs: u64,
    /// How long a second `connect()` caller waits for an in-flight attempt.
    #[serde(default = "default_connect_wait_secs")]
    pub connect_wait_secs: u64,
    /// Poll step used during that bounded wait, in milliseconds.
    #[serde(default = "default_connect_poll_millis")]
    pub connect_poll_millis: u64,
}

impl ChatConfig {
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_backoff_secs)
    }

    pub fn connect_wait(&self) -> Duration {
        Duration::from_secs(self.connect_wait_secs)
    }

    pub fn connect_poll(&self) -> Duration {
        Duration::from_millis(self.connect_poll_millis)
    }
}

/// Booking-notification routing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotifyConfig {
    /// Operator recipient for booking notifications (bare number or full JID).
    #[serde(default = "default_operator_jid")]
    pub operator_jid: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}
fn default_gateway_url() -> String {
    "ws://127.0.0.1:8765/ws".to_string()
}
fn default_session_dir() -> PathBuf {
    PathBuf::from("./session")
}
fn default_qr_path() -> PathBuf {
    PathBuf::from("./qrcode.png")
}
fn default_reconnect_backoff_secs() -> u64 {
    3
}
fn default_connect_wait_secs() -> u64 {
    10
}
fn default_connect_poll_millis() -> u64 {
    500
}
fn default_operator_jid() -> String {
    "5511999999999".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            session_dir: default_session_dir(),
            qr_path: default_qr_path(),
            reconnect_backoff_secs: default_reconnect_backoff_secs(),
            connect_wait_secs: default_connect_wait_secs(),
            connect_poll_millis: default_connect_poll_millis(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            operator_jid: default_operator_jid(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads `GatewayConfig` from `path`, returning `GatewayConfig::default()`
/// if the file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: GatewayConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GatewayConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &GatewayConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_expected_values() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.http.bind_addr, "0.0.0.0:3001");
        assert_eq!(cfg.chat.qr_path, PathBuf::from("./qrcode.png"));
        assert_eq!(cfg.chat.reconnect_backoff_secs, 3);
        assert_eq!(cfg.chat.connect_wait_secs, 10);
        assert_eq!(cfg.chat.connect_poll_millis, 500);
        assert_eq!(cfg.gateway.log_level, "info");
    }

    #[test]
    fn test_duration_helpers_convert_units() {
        let cfg = ChatConfig::default();
        assert_eq!(cfg.reconnect_backoff(), Duration::from_secs(3));
        assert_eq!(cfg.connect_wait(), Duration::from_secs(10));
        assert_eq!(cfg.connect_poll(), Duration::from_millis(500));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut cfg = GatewayConfig::default();
        cfg.http.bind_addr = "127.0.0.1:9000".to_string();
        cfg.notify.operator_jid = "5511988887777".to_string();

        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: GatewayConfig = toml::from_str(&toml_str).expect("deserialize");

        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let cfg: GatewayConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, GatewayConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_unspecified_defaults() {
        let toml_str = r#"
[chat]
gateway_url = "wss://chat.example.net/ws"
"#;
        let cfg: GatewayConfig = toml::from_str(toml_str).expect("deserialize partial");
        assert_eq!(cfg.chat.gateway_url, "wss://chat.example.net/ws");
        // Unspecified fields keep their defaults.
        assert_eq!(cfg.chat.reconnect_backoff_secs, 3);
        assert_eq!(cfg.http.bind_addr, "0.0.0.0:3001");
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let result: Result<GatewayConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");

        let cfg = load_config(&path).expect("absent file must not be an error");
        assert_eq!(cfg, GatewayConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");

        let mut cfg = GatewayConfig::default();
        cfg.gateway.log_level = "debug".to_string();
        cfg.chat.reconnect_backoff_secs = 7;

        save_config(&cfg, &path).expect("save");
        let loaded = load_config(&path).expect("load");

        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_load_config_surfaces_parse_error_for_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
