//! Zap gateway entry point.
//!
//! Wires the infrastructure (WebSocket dialer, session store, pairing
//! presenter) into the connection manager, puts the dispatch facade in
//! front of it, and serves the HTTP API until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML file, defaults on first run
//!  └─ ConnectionManager::new() -- owns the single chat session
//!       └─ initial connect()   -- background task, failure is non-fatal
//!  └─ axum::serve()            -- POST /api/send-message etc.
//! ```

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use zap_core::ReconnectPolicy;

use zap_gateway::api::{build_router, ApiState};
use zap_gateway::application::{ConnectionManager, DispatchService};
use zap_gateway::domain::config::load_config;
use zap_gateway::infrastructure::pairing::PairingPresenter;
use zap_gateway::infrastructure::session::SessionStore;
use zap_gateway::infrastructure::transport::ws::WsDialer;

/// Environment variable overriding the config file location.
const CONFIG_ENV: &str = "ZAP_GATEWAY_CONFIG";
/// Default config file, relative to the working directory.
const CONFIG_FILE: &str = "zap-gateway.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_FILE.to_string());
    let config = load_config(std::path::Path::new(&config_path))?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.gateway.log_level.clone())),
        )
        .init();

    info!("zap gateway starting (config: {config_path})");

    // ── Wiring ────────────────────────────────────────────────────────────────
    let dialer = Arc::new(WsDialer::new(config.chat.gateway_url.clone()));
    let session_store = Arc::new(SessionStore::new(config.chat.session_dir.clone()));
    let presenter = Arc::new(PairingPresenter::new(config.chat.qr_path.clone()));

    let manager = Arc::new(ConnectionManager::new(
        dialer,
        session_store,
        presenter,
        ReconnectPolicy::new(config.chat.reconnect_backoff()),
        config.chat.connect_wait(),
        config.chat.connect_poll(),
    ));

    let dispatch = Arc::new(DispatchService::new(
        Arc::clone(&manager),
        config.notify.operator_jid.clone(),
    ));

    // ── Initial connect ───────────────────────────────────────────────────────
    // A cold start with no reachable chat gateway must still serve HTTP (the
    // status endpoint reports disconnected), so the first connect runs in the
    // background and only logs its outcome.
    let connect_manager = Arc::clone(&manager);
    tokio::spawn(async move {
        if let Err(e) = connect_manager.connect().await {
            warn!("initial connect failed: {e}");
        }
    });

    // ── HTTP API ──────────────────────────────────────────────────────────────
    let router = build_router(ApiState { dispatch });
    let listener = tokio::net::TcpListener::bind(&config.http.bind_addr).await?;
    info!("HTTP API listening on {}", config.http.bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
            }
        })
        .await?;

    manager.disconnect().await;
    info!("zap gateway stopped");
    Ok(())
}
