//! Order API Handlers
//!
//! Thin HTTP layer over the reservation engine. Every response goes through
//! [`OrderView`], which discloses credential units only for completed
//! orders.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::auth::{Action, CurrentUser, authorize};
use crate::core::ServerState;
use crate::db::models::{OrderStatus, OrderView};
use crate::db::repository::OrderRepository;
use crate::orders::CartLine;
use crate::utils::time::now_ms;
use crate::utils::{AppError, AppResult, ErrorCode};

/// One cart line as submitted by the client
#[derive(Debug, Deserialize)]
pub struct CartLineRequest {
    pub product: String,
    pub quantity: u32,
}

/// Checkout payload
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<CartLineRequest>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// Status update payload (admin)
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

/// Sweep result
#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub cancelled: usize,
}

/// POST /api/orders - create a pending order from a cart
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<OrderView>> {
    let lines: Vec<CartLine> = payload
        .items
        .iter()
        .map(|item| CartLine {
            product: item.product.clone(),
            quantity: item.quantity,
        })
        .collect();

    let order = state
        .engine()
        .checkout(&user.id, &lines, payload.coupon_code.as_deref())
        .await?;

    // The view hides credential units while the order is pending
    Ok(Json(order.to_view()))
}

/// GET /api/orders - all orders, newest first (admin)
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<OrderView>>> {
    authorize(&user, Action::ListAllOrders)?;

    let repo = OrderRepository::new(state.get_db());
    let orders = repo
        .find_all()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    Ok(Json(orders.iter().map(|o| o.to_view()).collect()))
}

/// GET /api/orders/my-orders - the caller's orders, newest first
pub async fn my_orders(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<OrderView>>> {
    let repo = OrderRepository::new(state.get_db());
    let orders = repo
        .find_by_user(&user.id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    Ok(Json(orders.iter().map(|o| o.to_view()).collect()))
}

/// PUT /api/orders/{id}/pay - confirm payment (owner or admin)
pub async fn pay(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<OrderView>> {
    let repo = OrderRepository::new(state.get_db());
    let order = repo
        .find_by_id(&id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound).with_detail("order", id.clone()))?;

    authorize(&user, Action::PayOrder { owner: &order.user })?;

    let paid = state.engine().pay(&id).await?;
    Ok(Json(paid.to_view()))
}

/// PUT /api/orders/{id}/status - force a status transition (admin)
///
/// Transitions go through the engine's claim paths so terminal states stay
/// terminal and a cancellation returns the held units.
pub async fn set_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdateRequest>,
) -> AppResult<Json<OrderView>> {
    authorize(&user, Action::SetOrderStatus)?;

    let order = match payload.status {
        OrderStatus::Completed => state.engine().pay(&id).await?,
        OrderStatus::Cancelled => state.engine().cancel(&id).await?,
        OrderStatus::Pending => {
            return Err(AppError::validation(
                "status must be completed or cancelled",
            ));
        }
    };

    Ok(Json(order.to_view()))
}

/// PUT /api/orders/check-expired-orders - run one expiry sweep (admin)
pub async fn check_expired(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<SweepReport>> {
    authorize(&user, Action::TriggerSweep)?;

    let cancelled = state.engine().sweep_expired(now_ms()).await?;
    Ok(Json(SweepReport { cancelled }))
}
