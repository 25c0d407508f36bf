//! Ranking Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.
//!
//! See `README.md` for quickstart and `DESIGN.md` for architecture notes.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use haus_ranking::api::{self, AppState};
use haus_ranking::config::EngineConfig;
use haus_ranking::engine::RankingEngine;
use haus_ranking::metrics::Metrics;
use haus_ranking::persist::{DurableStore, JsonFileStore, NullStore};
use haus_ranking::store::ListingStore;

/// Bind address, overridable for container deployments.
const ENV_BIND_ADDR: &str = "RANKING_ADDR";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("haus_ranking=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = EngineConfig::load_or_default();

    let durable: Box<dyn DurableStore> = match &config.data.snapshot_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "durable snapshots enabled");
            Box::new(JsonFileStore::new(dir.clone())?)
        }
        None => Box::new(NullStore),
    };

    let metrics = Metrics::init(config.learning.learning_rate);

    let seed_path = config.data.listings_path.clone();
    let engine = RankingEngine::new(config, durable);
    if let Some(path) = seed_path {
        let listings = ListingStore::load_from_file(&path)?;
        let n = engine.seed_listings(listings);
        tracing::info!(count = n, "seeded listing population");
    }

    let state = AppState {
        engine: Arc::new(engine),
    };
    let app = api::router(state).merge(metrics.router());

    let addr = std::env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "ranking service listening");
    axum::serve(listener, app).await?;

    Ok(())
}
