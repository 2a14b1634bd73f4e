//! Palo Rosa storefront server

use anyhow::Result;
use palo_rosa::assistant::OfflineAssistant;
use palo_rosa::config::load_app_config;
use palo_rosa::http::{router, AppState};
use palo_rosa::store::{FileStore, PersistedStore};
use palo_rosa::Storefront;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_app_config()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    tracing::debug!(?config, "configuration loaded");

    let backend = FileStore::open(&config.data_dir)?;
    let shop = Storefront::hydrate(PersistedStore::new(backend), (&config).into());
    let app = router(AppState::new(shop, OfflineAssistant));

    tracing::info!("🌹 Palo Rosa listening on {}", config.bind_addr);
    axum::serve(tokio::net::TcpListener::bind(config.bind_addr).await?, app).await?;
    Ok(())
}
