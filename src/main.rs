use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use imoveis_backend::{
    build_router,
    config::AppConfig,
    database,
    store::{MemoryStore, PgStore, Store},
    AppState,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("imoveis_backend=info,sqlx=warn,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let pool = database::create_pool(database_url, config.database_max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;

            if config.skip_migrations {
                warn!("⚠️ Skipping migrations due to SKIP_MIGRATIONS=true");
            } else {
                database::run_migrations(&pool)
                    .await
                    .context("Failed to run migrations")?;
            }
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("⚠️ DATABASE_URL not set: using the in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, &config);

    // Periodically drop expired cache entries
    let cache = state.cache.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            cache.cleanup_expired();
        }
    });

    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;

    info!("🚀 Server starting on http://{}:{}", config.host, config.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
