//! Coupon API Handlers
//!
//! All coupon administration is admin-gated. The consumption path lives in
//! the reservation engine, not here.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::auth::{Action, CurrentUser, authorize};
use crate::core::ServerState;
use crate::db::models::{Coupon, CouponCreate};
use crate::db::repository::CouponRepository;
use crate::utils::validation::{MAX_NAME_LEN, validate_required_text};
use crate::utils::{AppError, AppResult, ErrorCode};

/// GET /api/coupons - list all coupons (admin)
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Coupon>>> {
    authorize(&user, Action::ManageCoupons)?;

    let repo = CouponRepository::new(state.get_db());
    let coupons = repo
        .find_all()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(coupons))
}

/// POST /api/coupons - create a coupon (admin)
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CouponCreate>,
) -> AppResult<Json<Coupon>> {
    authorize(&user, Action::ManageCoupons)?;

    validate_required_text(&payload.code, "code", MAX_NAME_LEN)?;
    if payload.discount_value.is_sign_negative() {
        return Err(AppError::validation("discount value must not be negative"));
    }
    if payload.max_uses == 0 {
        return Err(AppError::validation("max uses must be at least 1"));
    }

    let repo = CouponRepository::new(state.get_db());

    let existing = repo
        .find_by_code(&payload.code)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    if existing.is_some() {
        return Err(AppError::already_exists("Coupon"));
    }

    let created = repo
        .create(payload)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    tracing::info!(code = %created.code, max_uses = created.max_uses, "Coupon created");
    Ok(Json(created))
}

/// DELETE /api/coupons/{code} - delete a coupon by code (admin)
pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<Coupon>> {
    authorize(&user, Action::ManageCoupons)?;

    let repo = CouponRepository::new(state.get_db());
    let deleted = repo
        .delete_by_code(&code)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::CouponNotFound).with_detail("code", code))?;

    tracing::info!(code = %deleted.code, "Coupon deleted");
    Ok(Json(deleted))
}
