//! Reservation engine errors

use thiserror::Error;

use crate::db::models::OrderStatus;
use crate::db::repository::RepoError;
use crate::utils::{AppError, ErrorCode};

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Cart cannot be empty")]
    EmptyCart,

    #[error("Invalid quantity for product {0}")]
    InvalidQuantity(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Not enough stock for product {product}")]
    InsufficientStock { product: String },

    #[error("Invalid coupon code: {0}")]
    CouponNotFound(String),

    #[error("Coupon has expired: {0}")]
    CouponExpired(String),

    #[error("Coupon has reached maximum usage: {0}")]
    CouponExhausted(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order is not pending (status: {actual})")]
    OrderNotPending { actual: OrderStatus },

    #[error("Storage error: {0}")]
    Storage(#[from] RepoError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::EmptyCart => AppError::new(ErrorCode::EmptyCart),
            EngineError::InvalidQuantity(product) => {
                AppError::validation("quantity must be at least 1")
                    .with_detail("product", product)
            }
            EngineError::ProductNotFound(id) => {
                AppError::new(ErrorCode::ProductNotFound).with_detail("product", id)
            }
            EngineError::InsufficientStock { product } => {
                AppError::with_message(
                    ErrorCode::InsufficientStock,
                    format!("Product {} is out of stock", product),
                )
                .with_detail("product", product)
            }
            EngineError::CouponNotFound(code) => {
                AppError::new(ErrorCode::CouponNotFound).with_detail("code", code)
            }
            EngineError::CouponExpired(code) => {
                AppError::new(ErrorCode::CouponExpired).with_detail("code", code)
            }
            EngineError::CouponExhausted(code) => {
                AppError::new(ErrorCode::CouponExhausted).with_detail("code", code)
            }
            EngineError::OrderNotFound(id) => {
                AppError::new(ErrorCode::OrderNotFound).with_detail("order", id)
            }
            EngineError::OrderNotPending { actual } => {
                AppError::new(ErrorCode::OrderNotPending)
                    .with_detail("expected", "pending")
                    .with_detail("actual", actual.as_str())
            }
            EngineError::Storage(e) => {
                tracing::error!(error = %e, "Engine storage error");
                AppError::database(e.to_string())
            }
        }
    }
}
