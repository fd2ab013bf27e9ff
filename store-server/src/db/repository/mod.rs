//! Repository Module
//!
//! CRUD and conditional-update operations over SurrealDB tables. Every
//! mutation that carries a concurrency contract (stock, order status,
//! coupon uses) is a single conditional statement, never a read-then-write.

pub mod coupon;
pub mod order;
pub mod product;
pub mod user;

pub use coupon::CouponRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
pub use user::UserRepository;

use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Build a [`RecordId`] from an API-supplied id, accepting both the
/// `table:key` form and the bare key.
pub fn record_id(table: &str, id: &str) -> RecordId {
    let key = id.strip_prefix(&format!("{table}:")).unwrap_or(id);
    RecordId::from_table_key(table, key)
}

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_accepts_both_forms() {
        let a = record_id("product", "abc");
        let b = record_id("product", "product:abc");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "product:abc");
    }
}
