//! Database models
//!
//! Persisted document shapes plus the API-facing view types derived from
//! them. Ids are SurrealDB [`surrealdb::RecordId`]s; timestamps are Unix
//! milliseconds.

pub mod coupon;
pub mod order;
pub mod product;
pub mod user;

pub use coupon::{Coupon, CouponCreate, CouponId, DiscountType};
pub use order::{Order, OrderId, OrderLine, OrderLineView, OrderStatus, OrderView};
pub use product::{
    CredentialAccount, Product, ProductCreate, ProductId, ProductUpdate, ProductView, Review,
};
pub use user::{User, UserId, UserRole};
