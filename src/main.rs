use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use eftguessr::api;
use eftguessr::config::Config;
use eftguessr::state::AppStateInner;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    tracing::info!(
        "eftguessr starting, source: {:?}, scoring: {:?}, rounds: {}, listen: {}",
        config.source,
        config.scoring,
        config.default_rounds,
        config.listen_addr,
    );

    if let Some(path) = &config.round_log {
        tracing::info!("persisting rounds to {}", path.display());
    }

    let listen_addr = config.listen_addr.clone();
    let state = AppStateInner::from_config(config).into_shared();

    let app = api::router(state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&listen_addr)
        .await
        .context(format!("failed to bind to {listen_addr}"))?;

    tracing::info!("listening on {listen_addr}");

    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}
