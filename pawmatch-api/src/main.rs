use std::sync::Arc;

use pawmatch_api::config::AppConfig;
use pawmatch_api::store::{Backend, MemoryStore, PgStore};
use pawmatch_api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pawmatch_shared::middleware::init_tracing("pawmatch-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let store = if config.uses_memory_store() {
        tracing::warn!("using the in-memory store, data will not survive a restart");
        Backend::Memory(MemoryStore::new())
    } else {
        let pg = PgStore::connect(&config.database_url, config.pool_size)?;
        if config.auto_migrate {
            pg.ensure_schema()?;
        }
        tracing::info!(pool_size = config.pool_size, "connected to Postgres");
        Backend::Postgres(pg)
    };

    let metrics_handle = pawmatch_shared::middleware::init_metrics()?;

    let state = Arc::new(AppState {
        store,
        config,
        metrics_handle,
    });
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "pawmatch-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
