//! Shared application state for all routes. The snapshot is swapped on refresh.

use crate::config::GeneratorConfig;
use crate::generator::SnapshotHandle;
use crate::schema::DbPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    /// Schema-qualified reads on PostgreSQL; `None` on MySQL.
    pub schema: Option<String>,
    pub config: Arc<GeneratorConfig>,
    /// Replaced by refresh so new tables are served without restart.
    pub snapshot: SnapshotHandle,
}

impl AppState {
    pub fn new(pool: DbPool, config: Arc<GeneratorConfig>, snapshot: SnapshotHandle) -> Self {
        let schema = match pool {
            DbPool::Postgres(_) => Some(config.database.schema.clone()),
            DbPool::MySql(_) => None,
        };
        AppState {
            pool,
            schema,
            config,
            snapshot,
        }
    }
}
