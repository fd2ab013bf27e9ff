//! Coupon Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Coupon ID type
pub type CouponId = RecordId;

/// How a coupon discounts the order subtotal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `total - total * value / 100`
    Percentage,
    /// `total - value`
    Fixed,
}

/// Coupon model
///
/// `used_count` is monotone and bounded by `max_uses`; the bound is
/// enforced by a conditional increment, never by a read-then-write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CouponId>,
    pub code: String,
    pub discount_type: DiscountType,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_value: Decimal,
    /// Expiration instant (Unix ms), checked at consumption time
    pub expires_at: i64,
    pub max_uses: u32,
    #[serde(default)]
    pub used_count: u32,
    pub created_at: i64,
}

impl Coupon {
    /// Apply the discount to `total`, clamping the result at zero.
    pub fn discounted_total(&self, total: Decimal) -> Decimal {
        let discounted = match self.discount_type {
            DiscountType::Percentage => {
                total - total * self.discount_value / Decimal::ONE_HUNDRED
            }
            DiscountType::Fixed => total - self.discount_value,
        };
        discounted.max(Decimal::ZERO)
    }

    /// Whether the coupon is expired relative to `now_ms`
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }

    /// Whether every permitted use has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.used_count >= self.max_uses
    }
}

/// Create coupon payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponCreate {
    pub code: String,
    pub discount_type: DiscountType,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_value: Decimal,
    pub expires_at: i64,
    pub max_uses: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon(discount_type: DiscountType, value: i64) -> Coupon {
        Coupon {
            id: None,
            code: "SAVE10".to_string(),
            discount_type,
            discount_value: Decimal::from(value),
            expires_at: i64::MAX,
            max_uses: 1,
            used_count: 0,
            created_at: 0,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let c = coupon(DiscountType::Percentage, 10);
        assert_eq!(c.discounted_total(Decimal::from(100)), Decimal::from(90));
    }

    #[test]
    fn test_fixed_discount() {
        let c = coupon(DiscountType::Fixed, 30);
        assert_eq!(c.discounted_total(Decimal::from(100)), Decimal::from(70));
    }

    #[test]
    fn test_discount_clamped_at_zero() {
        let fixed = coupon(DiscountType::Fixed, 500);
        assert_eq!(fixed.discounted_total(Decimal::from(100)), Decimal::ZERO);

        let pct = coupon(DiscountType::Percentage, 150);
        assert_eq!(pct.discounted_total(Decimal::from(100)), Decimal::ZERO);
    }

    #[test]
    fn test_exhaustion_and_expiry() {
        let mut c = coupon(DiscountType::Fixed, 1);
        assert!(!c.is_exhausted());
        c.used_count = 1;
        assert!(c.is_exhausted());

        c.expires_at = 1000;
        assert!(c.is_expired(1000));
        assert!(c.is_expired(2000));
        assert!(!c.is_expired(999));
    }
}
