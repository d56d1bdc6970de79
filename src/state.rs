use std::sync::Arc;
use std::time::{Instant, SystemTime};

use sqlx::SqlitePool;

use crate::engine::{CoordinatorRegistry, EngineConfig};

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    pool: SqlitePool,
    registry: Arc<CoordinatorRegistry>,
}

impl AppState {
    pub fn new(pool: SqlitePool, registry: Arc<CoordinatorRegistry>) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            pool,
            registry,
        }
    }

    pub fn create_registry() -> Arc<CoordinatorRegistry> {
        Arc::new(CoordinatorRegistry::new(EngineConfig::from_env()))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn registry(&self) -> Arc<CoordinatorRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }
}
