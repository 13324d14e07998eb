use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use moop_access::app::{router, AppState};
use moop_access::config;

/// How often idle sessions are swept from the in-process store.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up MOOP_CONFIG, ACCESS_*, TOKEN_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting MOOP access gateway in {:?} mode", config.environment);

    let state = AppState::new(config.clone());
    if !state.tokens.can_issue() {
        tracing::warn!("No signing key loaded; JBrowse2 configs will carry no track tokens");
    }
    if !state.tokens.can_verify() {
        tracing::warn!("No verification key loaded; track requests need a trusted network");
    }

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired().await;
            if purged > 0 {
                tracing::debug!("Purged {} idle sessions, {} remain", purged, sessions.count().await);
            }
        }
    });

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("MOOP access gateway listening on http://{}", bind_addr);

    axum::serve(listener, router(state).into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")?;

    Ok(())
}
