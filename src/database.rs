use sqlx::{postgres::{PgConnectOptions, PgPoolOptions}, PgPool};
use std::str::FromStr;
use tracing::{info, warn};

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let options = PgConnectOptions::from_str(database_url)?
        .application_name("imoveis-backend")
        .statement_cache_capacity(200);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(2))
        .idle_timeout(std::time::Duration::from_secs(30))
        .connect_with(options)
        .await
}

/// Runs the embedded migrations. A version mismatch is logged, not returned.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("✅ Migrations completed successfully");
            Ok(())
        }
        Err(sqlx::migrate::MigrateError::VersionMismatch(version)) => {
            warn!("⚠️  Migration version mismatch: {}", version);
            warn!("Database has different migration state than expected");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
