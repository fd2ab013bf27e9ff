//! Coupon Repository
//!
//! `used_count` is only ever changed through `consume` and `release`, both
//! single conditional statements, so the `used_count <= max_uses` bound
//! holds under concurrent checkouts.

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Coupon, CouponCreate};
use crate::utils::time::now_ms;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const COUPON_TABLE: &str = "coupon";

#[derive(Clone)]
pub struct CouponRepository {
    base: BaseRepository,
}

impl CouponRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// All coupons
    pub async fn find_all(&self) -> RepoResult<Vec<Coupon>> {
        let coupons: Vec<Coupon> = self
            .base
            .db()
            .query("SELECT * FROM coupon ORDER BY created_at DESC")
            .await?
            .take(0)?;
        Ok(coupons)
    }

    /// Find a coupon by its unique code
    pub async fn find_by_code(&self, code: &str) -> RepoResult<Option<Coupon>> {
        let coupon: Option<Coupon> = self
            .base
            .db()
            .query("SELECT * FROM coupon WHERE code = $code LIMIT 1")
            .bind(("code", code.to_string()))
            .await?
            .take(0)?;
        Ok(coupon)
    }

    /// Create a new coupon
    pub async fn create(&self, data: CouponCreate) -> RepoResult<Coupon> {
        let coupon = Coupon {
            id: None,
            code: data.code,
            discount_type: data.discount_type,
            discount_value: data.discount_value,
            expires_at: data.expires_at,
            max_uses: data.max_uses,
            used_count: 0,
            created_at: now_ms(),
        };

        let created: Option<Coupon> = self.base.db().create(COUPON_TABLE).content(coupon).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create coupon".to_string()))
    }

    /// Delete a coupon by code, returning the deleted record
    pub async fn delete_by_code(&self, code: &str) -> RepoResult<Option<Coupon>> {
        let deleted: Option<Coupon> = self
            .base
            .db()
            .query("DELETE coupon WHERE code = $code RETURN BEFORE")
            .bind(("code", code.to_string()))
            .await?
            .take(0)?;
        Ok(deleted)
    }

    /// Consume one use of a coupon.
    ///
    /// The increment fires only for a live, non-exhausted coupon; `None`
    /// means the condition failed and the caller classifies why.
    pub async fn consume(&self, code: &str, now_ms: i64) -> RepoResult<Option<Coupon>> {
        let consumed: Option<Coupon> = self
            .base
            .db()
            .query(
                "UPDATE coupon SET used_count = used_count + 1 \
                 WHERE code = $code AND expires_at > $now AND used_count < max_uses \
                 RETURN AFTER",
            )
            .bind(("code", code.to_string()))
            .bind(("now", now_ms))
            .await?
            .take(0)?;
        Ok(consumed)
    }

    /// Give back one consumed use after a failed order persistence
    pub async fn release(&self, code: &str) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "UPDATE coupon SET used_count = used_count - 1 \
                 WHERE code = $code AND used_count > 0",
            )
            .bind(("code", code.to_string()))
            .await?;
        Ok(())
    }
}
