//! ReservationEngine - the order/inventory state machine
//!
//! Single in-process authority for every mutation of order status and
//! credential pools. Correctness comes from fine-grained per-resource
//! serialization, not a global lock:
//!
//! - each pool mutation runs under that product's lock and is itself a
//!   single conditional UPDATE with a stock floor check
//! - each status transition runs under that order's lock and is a single
//!   conditional UPDATE keyed on `status = 'pending'`
//! - coupon consumption is a single conditional increment bounded by
//!   `max_uses`
//!
//! # Checkout flow
//!
//! ```text
//! checkout(user, lines, coupon)
//!     ├─ 1. Reject empty cart / zero quantities
//!     ├─ 2. Withdraw units per line, in cart order (per-product lock)
//!     ├─ 3. Sum price * quantity into line snapshots
//!     ├─ 4. Consume coupon (conditional increment)
//!     ├─ 5. Persist pending order with the payment deadline
//!     └─ on any failure: return withdrawn units, release coupon use
//! ```
//!
//! A failure after step 2 compensates by returning every unit withdrawn for
//! this request, so a unit is never stranded outside both a pool and an
//! order.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tokio::sync::Mutex;

use crate::db::models::{Coupon, Order, OrderLine, OrderStatus};
use crate::db::repository::{CouponRepository, OrderRepository, ProductRepository, record_id};
use crate::utils::time::now_ms;

use super::error::{EngineError, EngineResult};

const PRODUCT_TABLE: &str = "product";
const ORDER_TABLE: &str = "order";

/// One cart line as submitted by the buyer
#[derive(Debug, Clone)]
pub struct CartLine {
    /// Product id, `product:key` or bare key
    pub product: String,
    pub quantity: u32,
}

/// The order/inventory reservation engine
pub struct ReservationEngine {
    db: Surreal<Db>,
    /// Payment hold duration in minutes
    hold_minutes: i64,
    /// Per-product serialization of pool mutations
    product_locks: DashMap<String, Arc<Mutex<()>>>,
    /// Per-order serialization of status transitions
    order_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for ReservationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationEngine")
            .field("hold_minutes", &self.hold_minutes)
            .finish()
    }
}

impl ReservationEngine {
    /// Create a new engine over the given database handle
    pub fn new(db: Surreal<Db>, hold_minutes: i64) -> Self {
        Self {
            db,
            hold_minutes,
            product_locks: DashMap::new(),
            order_locks: DashMap::new(),
        }
    }

    fn product_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.product_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn order_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.order_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Create a pending order from a cart.
    ///
    /// All-or-nothing: if any line cannot be satisfied, or the coupon or
    /// the order persistence fails, every unit withdrawn for this request
    /// goes back to its pool and a consumed coupon use is released.
    pub async fn checkout(
        &self,
        user: &str,
        lines: &[CartLine],
        coupon_code: Option<&str>,
    ) -> EngineResult<Order> {
        if lines.is_empty() {
            return Err(EngineError::EmptyCart);
        }
        for line in lines {
            if line.quantity == 0 {
                return Err(EngineError::InvalidQuantity(line.product.clone()));
            }
        }

        let products = ProductRepository::new(self.db.clone());
        let mut withdrawn: Vec<OrderLine> = Vec::with_capacity(lines.len());
        let mut subtotal = Decimal::ZERO;

        // Withdraw per line, in cart order. Each withdrawal is atomic; a
        // failure on a later line compensates for the earlier ones.
        for line in lines {
            match self.withdraw_line(&products, line).await {
                Ok(order_line) => {
                    subtotal += order_line.price * Decimal::from(order_line.quantity);
                    withdrawn.push(order_line);
                }
                Err(e) => {
                    self.return_lines(&withdrawn).await;
                    return Err(e);
                }
            }
        }

        let now = now_ms();

        // Consume the coupon only after all lines are withdrawn, so an
        // invalid cart never burns a use.
        let mut consumed: Option<Coupon> = None;
        let total_price = match coupon_code {
            Some(code) => match self.consume_coupon(code, subtotal, now).await {
                Ok((total, coupon)) => {
                    consumed = Some(coupon);
                    total
                }
                Err(e) => {
                    self.return_lines(&withdrawn).await;
                    return Err(e);
                }
            },
            None => subtotal,
        };

        let order = Order {
            id: None,
            user: user.to_string(),
            items: withdrawn.clone(),
            total_price,
            status: OrderStatus::Pending,
            payment_expires_at: now + self.hold_minutes * 60_000,
            created_at: now,
        };

        let orders = OrderRepository::new(self.db.clone());
        match orders.create(order).await {
            Ok(created) => {
                tracing::info!(
                    order_id = %created.id_string(),
                    user = %user,
                    total = %created.total_price,
                    lines = created.items.len(),
                    "Order created"
                );
                Ok(created)
            }
            Err(e) => {
                // Persistence failed: give back the coupon use and the units
                if let Some(coupon) = &consumed {
                    let coupons = CouponRepository::new(self.db.clone());
                    if let Err(release_err) = coupons.release(&coupon.code).await {
                        tracing::error!(
                            code = %coupon.code,
                            error = %release_err,
                            "Failed to release coupon use after persistence failure"
                        );
                    }
                }
                self.return_lines(&withdrawn).await;
                Err(e.into())
            }
        }
    }

    /// Confirm payment: the pending -> completed claim.
    ///
    /// Policy: paying after the deadline still succeeds as long as no sweep
    /// has claimed the order first (first claimer wins).
    pub async fn pay(&self, order_id: &str) -> EngineResult<Order> {
        let rid = record_id(ORDER_TABLE, order_id);
        let lock = self.order_lock(&rid.to_string());
        let _guard = lock.lock().await;

        let orders = OrderRepository::new(self.db.clone());
        if let Some(order) = orders.claim_transition(&rid, OrderStatus::Completed).await? {
            tracing::info!(order_id = %order.id_string(), "Order paid");
            return Ok(order);
        }

        match orders.find_by_id(order_id).await? {
            None => Err(EngineError::OrderNotFound(order_id.to_string())),
            Some(order) => Err(EngineError::OrderNotPending {
                actual: order.status,
            }),
        }
    }

    /// Cancel a pending order and return its units to their pools.
    pub async fn cancel(&self, order_id: &str) -> EngineResult<Order> {
        let rid = record_id(ORDER_TABLE, order_id);
        let lock = self.order_lock(&rid.to_string());
        let guard = lock.lock().await;

        let orders = OrderRepository::new(self.db.clone());
        match orders.claim_transition(&rid, OrderStatus::Cancelled).await? {
            Some(order) => {
                drop(guard);
                self.return_lines(&order.items).await;
                tracing::info!(order_id = %order.id_string(), "Order cancelled");
                Ok(order)
            }
            None => match orders.find_by_id(order_id).await? {
                None => Err(EngineError::OrderNotFound(order_id.to_string())),
                Some(order) => Err(EngineError::OrderNotPending {
                    actual: order.status,
                }),
            },
        }
    }

    /// Cancel every pending order whose deadline has passed.
    ///
    /// Idempotent per order: the pending -> cancelled claim decides, so a
    /// concurrent pay or a second sweep can never double-return units.
    /// Returns the number of orders cancelled by this pass.
    pub async fn sweep_expired(&self, now_ms: i64) -> EngineResult<usize> {
        let orders = OrderRepository::new(self.db.clone());
        let expired = orders.find_expired(now_ms).await?;
        let mut cancelled = 0usize;

        for order in expired {
            let Some(rid) = order.id.clone() else {
                continue;
            };
            let lock = self.order_lock(&rid.to_string());
            let guard = lock.lock().await;

            match orders.claim_transition(&rid, OrderStatus::Cancelled).await {
                Ok(Some(claimed)) => {
                    drop(guard);
                    self.return_lines(&claimed.items).await;
                    cancelled += 1;
                    tracing::info!(
                        order_id = %claimed.id_string(),
                        user = %claimed.user,
                        "Expired order cancelled, units returned"
                    );
                }
                // Lost the race to a pay or another sweep; nothing to do
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(order_id = %rid, error = %e, "Failed to claim expired order");
                }
            }
        }

        Ok(cancelled)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Withdraw one cart line from its pool under the product lock.
    async fn withdraw_line(
        &self,
        products: &ProductRepository,
        line: &CartLine,
    ) -> EngineResult<OrderLine> {
        let rid = record_id(PRODUCT_TABLE, &line.product);
        let lock = self.product_lock(&rid.to_string());
        let _guard = lock.lock().await;

        match products.withdraw_accounts(&rid, line.quantity).await? {
            Some(before) => {
                let accounts = before
                    .accounts
                    .into_iter()
                    .take(line.quantity as usize)
                    .collect();
                Ok(OrderLine {
                    product: rid,
                    name: before.name,
                    price: before.price,
                    quantity: line.quantity,
                    accounts,
                })
            }
            None => {
                // The conditional update did not fire: either the product
                // is missing or it cannot cover the quantity
                match products.find_by_id(&rid.to_string()).await? {
                    Some(product) => Err(EngineError::InsufficientStock {
                        product: product.name,
                    }),
                    None => Err(EngineError::ProductNotFound(line.product.clone())),
                }
            }
        }
    }

    /// Consume one coupon use and compute the discounted total.
    async fn consume_coupon(
        &self,
        code: &str,
        subtotal: Decimal,
        now_ms: i64,
    ) -> EngineResult<(Decimal, Coupon)> {
        let coupons = CouponRepository::new(self.db.clone());
        if let Some(coupon) = coupons.consume(code, now_ms).await? {
            return Ok((coupon.discounted_total(subtotal), coupon));
        }

        // The conditional increment did not fire; classify why
        match coupons.find_by_code(code).await? {
            None => Err(EngineError::CouponNotFound(code.to_string())),
            Some(coupon) if coupon.is_expired(now_ms) => {
                Err(EngineError::CouponExpired(code.to_string()))
            }
            Some(coupon) if coupon.is_exhausted() => {
                Err(EngineError::CouponExhausted(code.to_string()))
            }
            Some(_) => Err(EngineError::CouponNotFound(code.to_string())),
        }
    }

    /// Return withdrawn units to their pools (compensation and
    /// cancellation path). Best effort per line: a failure is logged, the
    /// remaining lines are still returned.
    async fn return_lines(&self, lines: &[OrderLine]) {
        let products = ProductRepository::new(self.db.clone());
        for line in lines {
            if line.accounts.is_empty() {
                continue;
            }
            let lock = self.product_lock(&line.product.to_string());
            let _guard = lock.lock().await;

            match products.return_accounts(&line.product, &line.accounts).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(
                        product = %line.product,
                        count = line.accounts.len(),
                        "Product deleted while holding its units, units dropped"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        product = %line.product,
                        count = line.accounts.len(),
                        error = %e,
                        "Failed to return units to pool"
                    );
                }
            }
        }
    }
}
