//! Order Repository
//!
//! Status transitions are claim-style conditional updates keyed on the
//! current status being `pending`, so a payment and a sweep racing on the
//! same order can never both win.

use super::{BaseRepository, RepoError, RepoResult, record_id};
use crate::db::models::{Order, OrderStatus};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

const ORDER_TABLE: &str = "order";

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Persist a new order
    pub async fn create(&self, order: Order) -> RepoResult<Order> {
        let created: Option<Order> = self.base.db().create(ORDER_TABLE).content(order).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create order".to_string()))
    }

    /// Find order by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let order: Option<Order> = self.base.db().select(record_id(ORDER_TABLE, id)).await?;
        Ok(order)
    }

    /// All orders, newest first
    pub async fn find_all(&self) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM order ORDER BY created_at DESC")
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// One user's orders, newest first
    pub async fn find_by_user(&self, user: &str) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM order WHERE user = $user ORDER BY created_at DESC")
            .bind(("user", user.to_string()))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// Pending orders whose payment deadline has passed
    pub async fn find_expired(&self, now_ms: i64) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query(
                "SELECT * FROM order \
                 WHERE status = $pending AND payment_expires_at < $now \
                 ORDER BY created_at ASC",
            )
            .bind(("pending", OrderStatus::Pending))
            .bind(("now", now_ms))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// Atomically transition `pending -> to`.
    ///
    /// Returns the updated order when this caller won the claim, `None`
    /// when the order was absent or no longer pending.
    pub async fn claim_transition(
        &self,
        order: &RecordId,
        to: OrderStatus,
    ) -> RepoResult<Option<Order>> {
        let claimed: Option<Order> = self
            .base
            .db()
            .query("UPDATE $order SET status = $to WHERE status = $from RETURN AFTER")
            .bind(("order", order.clone()))
            .bind(("to", to))
            .bind(("from", OrderStatus::Pending))
            .await?
            .take(0)?;
        Ok(claimed)
    }
}
