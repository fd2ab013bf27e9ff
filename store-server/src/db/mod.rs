//! Database Module
//!
//! Embedded SurrealDB: RocksDB-backed on disk in production, in-memory in
//! tests. The service owns the connection, selects the namespace/database
//! and defines the unique indexes the handlers rely on.

pub mod models;
pub mod repository;

use std::path::Path;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

use crate::utils::AppError;

const NAMESPACE: &str = "store";
const DATABASE: &str = "store";

/// Database service — owns the embedded SurrealDB connection
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open a RocksDB-backed database at the given directory
    pub async fn new(db_dir: &Path) -> Result<Self, AppError> {
        let db: Surreal<Db> = Surreal::new::<RocksDb>(db_dir)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        let service = Self::finish(db).await?;
        tracing::info!(path = %db_dir.display(), "Database opened (SurrealDB, RocksDB backend)");
        Ok(service)
    }

    /// Open an in-memory database (tests)
    pub async fn new_memory() -> Result<Self, AppError> {
        let db: Surreal<Db> = Surreal::new::<Mem>(())
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;
        Self::finish(db).await
    }

    async fn finish(db: Surreal<Db>) -> Result<Self, AppError> {
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        define_indexes(&db).await?;

        Ok(Self { db })
    }
}

/// Define unique indexes; idempotent across restarts.
async fn define_indexes(db: &Surreal<Db>) -> Result<(), AppError> {
    db.query(
        "DEFINE INDEX IF NOT EXISTS idx_user_username ON TABLE user COLUMNS username UNIQUE;
         DEFINE INDEX IF NOT EXISTS idx_user_email ON TABLE user COLUMNS email UNIQUE;
         DEFINE INDEX IF NOT EXISTS idx_coupon_code ON TABLE coupon COLUMNS code UNIQUE;",
    )
    .await
    .map_err(|e| AppError::database(format!("Failed to define indexes: {e}")))?;
    Ok(())
}
