//! Product API Handlers
//!
//! Catalog CRUD is admin-gated; reviews belong to any authenticated buyer.
//! Credential units are never serialized into a product response, only the
//! derived stock count.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::auth::{Action, CurrentUser, authorize};
use crate::core::ServerState;
use crate::db::models::{
    CredentialAccount, ProductCreate, ProductUpdate, ProductView, Review,
};
use crate::db::repository::ProductRepository;
use crate::utils::time::now_ms;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_TEXT_LEN, MAX_URL_LEN, validate_optional_text, validate_required_text,
};
use crate::utils::{AppError, AppResult, ErrorCode};

/// GET /api/products - public catalog listing
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<ProductView>>> {
    let repo = ProductRepository::new(state.get_db());
    let products = repo
        .find_all()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

/// GET /api/products/{id} - public product detail
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ProductView>> {
    let repo = ProductRepository::new(state.get_db());
    let product = repo
        .find_by_id(&id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("id", id))?;

    Ok(Json(ProductView::from(product)))
}

fn validate_product_fields(
    name: Option<&String>,
    description: Option<&String>,
    image: Option<&String>,
    price_negative: bool,
) -> AppResult<()> {
    if let Some(name) = name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    if let Some(description) = description {
        validate_required_text(description, "description", MAX_TEXT_LEN)?;
    }
    if let Some(image) = image
        && image.len() > MAX_URL_LEN
    {
        return Err(AppError::validation("image url is too long"));
    }
    if price_negative {
        return Err(AppError::validation("price must not be negative"));
    }
    Ok(())
}

/// POST /api/products - create a product with an empty pool (admin)
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<ProductCreate>,
) -> AppResult<Json<ProductView>> {
    authorize(&user, Action::ManageCatalog)?;
    validate_product_fields(
        Some(&payload.name),
        Some(&payload.description),
        Some(&payload.image),
        payload.price.is_sign_negative(),
    )?;

    let repo = ProductRepository::new(state.get_db());
    let created = repo
        .create(payload)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    tracing::info!(product_id = %created.id_string(), name = %created.name, "Product created");
    Ok(Json(ProductView::from(created)))
}

/// PUT /api/products/{id} - update product metadata (admin)
pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<ProductView>> {
    authorize(&user, Action::ManageCatalog)?;
    validate_product_fields(
        payload.name.as_ref(),
        payload.description.as_ref(),
        payload.image.as_ref(),
        payload.price.is_some_and(|p| p.is_sign_negative()),
    )?;
    validate_optional_text(&payload.category, "category", MAX_NAME_LEN)?;
    validate_optional_text(&payload.brand, "brand", MAX_NAME_LEN)?;

    let repo = ProductRepository::new(state.get_db());
    let updated = repo
        .update(&id, payload)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("id", id))?;

    Ok(Json(ProductView::from(updated)))
}

/// DELETE /api/products/{id} - delete a product (admin)
pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ProductView>> {
    authorize(&user, Action::ManageCatalog)?;

    let repo = ProductRepository::new(state.get_db());
    let deleted = repo
        .delete(&id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("id", id))?;

    tracing::info!(product_id = %deleted.id_string(), "Product deleted");
    Ok(Json(ProductView::from(deleted)))
}

/// Credential batch upload payload
#[derive(Debug, Deserialize)]
pub struct AccountBatch {
    pub accounts: Vec<CredentialAccount>,
}

/// POST /api/products/{id}/accounts - append credential units (admin)
pub async fn add_accounts(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<AccountBatch>,
) -> AppResult<Json<ProductView>> {
    authorize(&user, Action::ManageCatalog)?;

    if payload.accounts.is_empty() {
        return Err(AppError::new(ErrorCode::EmptyAccountBatch));
    }
    for unit in &payload.accounts {
        if unit.email.trim().is_empty() || unit.secret.is_empty() {
            return Err(AppError::validation(
                "every account needs an email and a secret",
            ));
        }
    }

    let count = payload.accounts.len();
    let repo = ProductRepository::new(state.get_db());
    let updated = repo
        .add_accounts(&id, payload.accounts)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("id", id))?;

    tracing::info!(
        product_id = %updated.id_string(),
        count,
        stock = updated.stock,
        "Credential units added"
    );
    Ok(Json(ProductView::from(updated)))
}

// =============================================================================
// Review Handlers
// =============================================================================

/// Review payload
#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    pub rating: u8,
    pub comment: String,
}

fn validate_review(payload: &ReviewPayload) -> AppResult<()> {
    if payload.rating > 5 {
        return Err(AppError::validation("rating must be between 0 and 5"));
    }
    validate_required_text(&payload.comment, "comment", MAX_TEXT_LEN)
}

/// POST /api/products/{id}/reviews - add a review (one per user)
pub async fn add_review(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<ReviewPayload>,
) -> AppResult<Json<ProductView>> {
    validate_review(&payload)?;

    let repo = ProductRepository::new(state.get_db());
    let mut product = repo
        .find_by_id(&id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("id", id.clone()))?;

    if product.reviews.iter().any(|r| r.user == user.id) {
        return Err(AppError::new(ErrorCode::ReviewAlreadyExists));
    }

    let now = now_ms();
    product.reviews.push(Review {
        user: user.id.clone(),
        name: user.username.clone(),
        rating: payload.rating,
        comment: payload.comment,
        created_at: now,
        updated_at: now,
    });
    product.recompute_rating();

    let updated = repo
        .save_reviews(&id, product.reviews, product.rating, product.num_reviews)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("id", id))?;

    Ok(Json(ProductView::from(updated)))
}

/// PUT /api/products/{id}/reviews - edit own review
pub async fn update_review(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<ReviewPayload>,
) -> AppResult<Json<ProductView>> {
    validate_review(&payload)?;

    let repo = ProductRepository::new(state.get_db());
    let mut product = repo
        .find_by_id(&id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("id", id.clone()))?;

    let review = product
        .reviews
        .iter_mut()
        .find(|r| r.user == user.id)
        .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound))?;

    review.rating = payload.rating;
    review.comment = payload.comment;
    review.updated_at = now_ms();
    product.recompute_rating();

    let updated = repo
        .save_reviews(&id, product.reviews, product.rating, product.num_reviews)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("id", id))?;

    Ok(Json(ProductView::from(updated)))
}

/// DELETE /api/products/{id}/reviews - delete own review
pub async fn delete_review(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ProductView>> {
    let repo = ProductRepository::new(state.get_db());
    let mut product = repo
        .find_by_id(&id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("id", id.clone()))?;

    let before = product.reviews.len();
    product.reviews.retain(|r| r.user != user.id);
    if product.reviews.len() == before {
        return Err(AppError::new(ErrorCode::ReviewNotFound));
    }
    product.recompute_rating();

    let updated = repo
        .save_reviews(&id, product.reviews, product.rating, product.num_reviews)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("id", id))?;

    Ok(Json(ProductView::from(updated)))
}
