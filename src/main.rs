//! Model Evaluation Scoreboard
//!
//! Serves a scoreboard of per-step model scores (0-2) and notes over a small
//! JSON API, with separate "gpu" and "cpu" boards stored as JSON files.
//!
//! Configuration (environment):
//! - SCOREBOARD_HOST / SCOREBOARD_PORT: listen address (default 0.0.0.0:10007)
//! - SCOREBOARD_DATA_DIR: where data-gpu.json / data-cpu.json live (default data)
//! - SCOREBOARD_TEMPLATE: document copied in on first access (default assets/data-template.json)
//! - SCOREBOARD_INDEX: page served at / (default assets/index.html)

mod api;
mod config;
mod models;
mod store;

use std::sync::Arc;
use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::Config;
use models::Mode;
use store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let store = Store::new(&config.data_dir, &config.template_path);
    for mode in Mode::ALL {
        tracing::info!("{} board: {:?}", mode, store.path_for(mode));
    }
    if !store.template_path().exists() {
        tracing::warn!(
            "Template {:?} not found; boards without a data file will fail to load",
            store.template_path()
        );
    }

    let state = Arc::new(AppState { store });
    let app = api::app(state, &config.index_path);

    tracing::info!("Starting scoreboard at http://{}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
