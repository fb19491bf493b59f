//! taro-rd - Tarot Reading Pipeline Service
//!
//! HTTP REST + SSE service. Sessions draw a three-card spread; a
//! submitted question runs the sequential interpretation pipeline and
//! publishes per-session progress events.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use taro_common::config::load_config;
use taro_common::events::EventHub;
use taro_rd::api::{build_router, AppState};
use taro_rd::pipeline::{PipelineService, WorkerPool};
use taro_rd::providers::providers_from_config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting taro-rd (Tarot Reading) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var("TARO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("taro.toml"));
    let config = load_config(&config_path)?;

    let db_pool = taro_rd::db::init_database_pool(config.database_path.as_ref()).await?;
    info!("Database connection established");

    let hub = EventHub::new(config.events.channel_capacity);
    let (text, image) = providers_from_config(&config);
    let workers = WorkerPool::new(&config.pipeline);
    let pipeline = PipelineService::new(
        db_pool.clone(),
        hub.clone(),
        text,
        image,
        workers,
        Duration::from_secs(config.pipeline.call_timeout_secs),
    );

    let state = AppState {
        db: db_pool,
        hub,
        pipeline: pipeline.clone(),
        events: config.events.clone(),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!("Listening on http://{}", config.server.bind_address);
    info!("Health check: http://{}/health", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown signal received, draining pipeline runs");
    pipeline
        .shutdown(Duration::from_secs(config.pipeline.shutdown_grace_secs))
        .await;
    info!("taro-rd stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}
