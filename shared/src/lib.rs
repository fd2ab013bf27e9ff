//! Shared types for the account store
//!
//! Common types used across crates: error codes, error types,
//! response structures, and API DTOs.

pub mod client;
pub mod error;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
