//! Product Model
//!
//! A product owns a pool of sellable credential units. `stock` is derived
//! and must always equal `accounts.len()` after a successful mutation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Product ID type
pub type ProductId = RecordId;

/// One sellable credential unit: an email/secret pair held in a product's
/// pool until it is withdrawn into an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAccount {
    pub email: String,
    pub secret: String,
}

/// A buyer's review, embedded in the product document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Reviewer user id (string form)
    pub user: String,
    /// Reviewer display name captured at review time
    pub name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Product model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProductId>,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    /// Average review rating, recomputed on every review mutation
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub num_reviews: u32,
    /// Derived unit count, kept equal to `accounts.len()`
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub accounts: Vec<CredentialAccount>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// Recompute `rating` and `num_reviews` from the embedded reviews.
    pub fn recompute_rating(&mut self) {
        self.num_reviews = self.reviews.len() as u32;
        self.rating = if self.reviews.is_empty() {
            0.0
        } else {
            let sum: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
            f64::from(sum) / f64::from(self.num_reviews)
        };
    }

    /// String form of the record id (empty for an unsaved product)
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
    }
}

/// Create product payload (stock starts at zero; units are added through
/// the accounts endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
}

/// Update product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

/// Buyer-facing product view
///
/// Same shape as [`Product`] minus the credential pool; units are never
/// serialized into a catalog response.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub description: String,
    pub image: String,
    pub category: String,
    pub brand: String,
    pub rating: f64,
    pub num_reviews: u32,
    pub stock: u32,
    pub reviews: Vec<Review>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Product> for ProductView {
    fn from(p: Product) -> Self {
        Self {
            id: p.id.as_ref().map(|id| id.to_string()).unwrap_or_default(),
            name: p.name,
            price: p.price,
            description: p.description,
            image: p.image,
            category: p.category,
            brand: p.brand,
            rating: p.rating,
            num_reviews: p.num_reviews,
            stock: p.stock,
            reviews: p.reviews,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}
