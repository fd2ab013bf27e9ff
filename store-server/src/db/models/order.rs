//! Order Model
//!
//! An order snapshots product name and price at creation time and owns the
//! credential units withdrawn for it. Units live in exactly one place: a
//! product pool or an order line, never both.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use surrealdb::RecordId;

use super::product::CredentialAccount;

/// Order ID type
pub type OrderId = RecordId;

/// Order lifecycle state
///
/// `Pending` is the only non-terminal state. `Completed` and `Cancelled`
/// are terminal; once reached the status never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Whether this state admits no further transitions
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One order line: product reference, price snapshot and the withdrawn units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// Originating product, needed to return units on cancellation
    pub product: RecordId,
    /// Product name captured at order time
    pub name: String,
    /// Unit price captured at order time, decoupled from later price edits
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    /// The exact credential units held by this line
    #[serde(default)]
    pub accounts: Vec<CredentialAccount>,
}

/// Order model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OrderId>,
    /// Owning user id (string form of the user record id)
    pub user: String,
    pub items: Vec<OrderLine>,
    /// Discounted total, computed at creation and immutable after
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub status: OrderStatus,
    /// Deadline of the payment hold (Unix ms). Advisory data: cancellation
    /// only happens when the sweeper claims the order.
    pub payment_expires_at: i64,
    pub created_at: i64,
}

impl Order {
    /// String form of the record id (empty for an unsaved order)
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
    }

    /// Build the buyer-facing view.
    ///
    /// Credential units are disclosed only for a completed order; for any
    /// other status the line `accounts` are empty.
    pub fn to_view(&self) -> OrderView {
        let reveal = self.status == OrderStatus::Completed;
        OrderView {
            id: self.id_string(),
            user: self.user.clone(),
            status: self.status,
            total_price: self.total_price,
            payment_expires_at: self.payment_expires_at,
            created_at: self.created_at,
            items: self
                .items
                .iter()
                .map(|line| OrderLineView {
                    product: line.product.to_string(),
                    name: line.name.clone(),
                    price: line.price,
                    quantity: line.quantity,
                    accounts: if reveal { line.accounts.clone() } else { Vec::new() },
                })
                .collect(),
        }
    }
}

/// Buyer-facing order line
#[derive(Debug, Clone, Serialize)]
pub struct OrderLineView {
    pub product: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    pub accounts: Vec<CredentialAccount>,
}

/// Buyer-facing order
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: String,
    pub user: String,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub payment_expires_at: i64,
    pub created_at: i64,
    pub items: Vec<OrderLineView>,
}
