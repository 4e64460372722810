use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::config::Config;
use crate::error::AppResult;
use crate::realtime::RealtimeBus;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub bus: RealtimeBus,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the shared state: connect the pool, run migrations, wire the
    /// bus. The caller starts the bus listener when it is ready to
    /// receive.
    pub async fn init(config: Config) -> AppResult<Self> {
        let db = crate::db::init_pool(&config.database_url).await?;
        crate::db::MIGRATOR
            .run(&db)
            .await
            .map_err(|e| crate::error::AppError::Config(format!("migrations failed: {e}")))?;
        let bus = RealtimeBus::new(&config.redis_url)?;
        Ok(Self {
            db,
            bus,
            config: Arc::new(config),
        })
    }
}
