//! hearth gateway entry point.
//!
//! Boots the offline-first caching gateway: loads configuration, opens
//! the cache database, installs the precache manifest for the target
//! cache generation, activates it (garbage-collecting previous
//! generations) only when the install succeeded, spawns the periodic
//! trim sweeper, and serves HTTP.

use std::sync::Arc;

use anyhow::Result;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use url::Url;

use hearth_client::{CacheManager, FetchClient, FetchConfig};
use hearth_core::{AppConfig, CacheDb};

mod error;
mod gateway;
mod relay;

use gateway::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, version = %config.cache_version, "starting hearth gateway");

    let db = CacheDb::open(&config.db_path).await?;
    let fetch_config = FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..Default::default()
    };
    let fetcher = Arc::new(FetchClient::new(fetch_config)?);
    let mut manager = CacheManager::from_config(db, fetcher, &config);

    let origin = Url::parse(&config.origin).map_err(|e| anyhow::anyhow!("invalid origin {}: {e}", config.origin))?;

    // Install the new generation. A failed install is not fatal, and it
    // must not activate: the last activated generation keeps serving
    // until a future successful install.
    match manager.install(&config.precache, &origin).await {
        Ok(count) => {
            tracing::info!(entries = count, "precache installed");
            let removed = manager.activate().await?;
            tracing::info!(removed, "activation garbage collection done");
        }
        Err(e) => {
            tracing::warn!(error = %e, "precache install failed, previous generation stays in effect");
            manager.adopt_active_generation().await?;
        }
    }

    manager.spawn_sweeper(config.sweep_interval());

    let listen_addr = config.listen_addr.clone();
    let state = AppState {
        manager,
        origin,
        config: Arc::new(config),
        http: reqwest::Client::new(),
    };

    let app = gateway::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(addr = %listen_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
