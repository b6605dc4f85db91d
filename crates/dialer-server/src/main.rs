//! Dialer server binary: the entry point for dial-out sessions.
//!
//! Loads configuration, installs structured logging, and serves the session
//! API until the process is stopped.

use dialer_server::{app, config, AppState, SessionRegistry};
use dialer_voice::{DailyClient, RoomProvisioner};
use std::error::Error;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("DIALER_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // An invalid configuration stops startup rather than falling back.
    let config = config::load_config(selected_config_path)?;

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    if config.daily.api_key.is_empty() {
        tracing::warn!("daily.api_key is empty; dial-out requests will be rejected upstream");
    }

    let daily = DailyClient::new(&config.daily)?;
    let provisioner = RoomProvisioner::new(
        daily.clone(),
        config.dialout.sip_domain.clone(),
        config.dialout.room_ttl(),
    );
    let state = AppState {
        daily,
        provisioner,
        max_attempts: config.dialout.max_attempts()?,
        sessions: SessionRegistry::new(),
    };

    let addr = SocketAddr::new(config.server.host, config.server.port);
    tracing::info!(%addr, max_attempts = state.max_attempts.get(), "starting dialer server");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    tracing::info!("dialer server shut down");
    Ok(())
}
