use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: PgPool,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, String> {
        let db_pool = db::build_pool(&config)?;
        Ok(Self {
            config: Arc::new(config),
            db_pool,
        })
    }
}
