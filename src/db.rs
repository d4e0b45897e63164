use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::AppConfig;

/// Build the shared connection pool. `connect_lazy` keeps startup
/// synchronous; the first query establishes the connection.
pub fn build_pool(config: &AppConfig) -> Result<PgPool, String> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| "DATABASE_URL is not set.".to_string())?;

    PgPoolOptions::new()
        .max_connections(config.db_pool_max_connections)
        .min_connections(config.db_pool_min_connections)
        .acquire_timeout(Duration::from_secs(config.db_pool_acquire_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.db_pool_idle_timeout_seconds))
        .connect_lazy(url)
        .map_err(|error| format!("Invalid DATABASE_URL: {error}"))
}
