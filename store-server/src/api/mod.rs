//! API route modules
//!
//! # Structure
//!
//! - [`health`] - liveness check
//! - [`auth`] - registration, login, current principal
//! - [`products`] - catalog, reviews and credential pool upload
//! - [`coupons`] - coupon administration
//! - [`orders`] - checkout, payment, expiry sweep

pub mod auth;
pub mod coupons;
pub mod health;
pub mod orders;
pub mod products;
