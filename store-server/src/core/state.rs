//! Server state

use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::JwtService;
use crate::core::config::Config;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::db::DbService;
use crate::orders::{ExpirySweeper, ReservationEngine};
use crate::utils::{AppError, AppResult};

/// Server state, the shared handle every request sees
///
/// | Field | Type | Purpose |
/// |-------|------|---------|
/// | config | Config | immutable configuration |
/// | db | Surreal<Db> | embedded database |
/// | jwt_service | Arc<JwtService> | token issuing and validation |
/// | engine | Arc<ReservationEngine> | order/inventory state machine |
///
/// Cloning is shallow (`Arc` all the way down).
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Config,
    /// Embedded database (SurrealDB)
    pub db: Surreal<Db>,
    /// JWT service
    pub jwt_service: Arc<JwtService>,
    /// Order reservation engine
    pub engine: Arc<ReservationEngine>,
}

impl ServerState {
    /// Initialize server state against the on-disk database
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::internal(format!("Failed to create work directory: {e}")))?;

        let db_service = DbService::new(&config.database_dir()).await?;
        Ok(Self::with_db(config.clone(), db_service.db))
    }

    /// Build state around an existing database handle (tests use this with
    /// an in-memory database)
    pub fn with_db(config: Config, db: Surreal<Db>) -> Self {
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let engine = Arc::new(ReservationEngine::new(
            db.clone(),
            config.payment_hold_minutes,
        ));

        Self {
            config,
            db,
            jwt_service,
            engine,
        }
    }

    /// Register background tasks; called once before serving
    pub fn spawn_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let sweeper = ExpirySweeper::new(
            self.engine.clone(),
            self.config.sweep_interval_secs,
            tasks.shutdown_token(),
        );
        tasks.spawn("expiry_sweeper", TaskKind::Periodic, sweeper.run());
    }

    /// Database handle
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// JWT service handle
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// Reservation engine handle
    pub fn engine(&self) -> Arc<ReservationEngine> {
        self.engine.clone()
    }
}
