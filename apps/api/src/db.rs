use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;

/// Pool sizing comes from configuration so deployments can tune it without a
/// rebuild; the acquire timeout keeps a dead database from stalling the
/// best-effort persistence path in the orchestrator.
fn pool_options(config: &Config) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
}

/// Creates the PostgreSQL pool backing the creation record store.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    info!(
        max_connections = config.db_max_connections,
        "Connecting to the creations database..."
    );

    let pool = pool_options(config).connect(&config.database_url).await?;

    info!("Creations database pool established");
    Ok(pool)
}
