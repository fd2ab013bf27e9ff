//! Product Repository
//!
//! Pool mutations (withdraw, return, account upload) are single conditional
//! UPDATE statements so the `stock == accounts.len()` invariant survives
//! concurrent access; the reservation engine additionally serializes them
//! per product.

use serde::Serialize;

use super::{BaseRepository, RepoError, RepoResult, record_id};
use crate::db::models::{CredentialAccount, Product, ProductCreate, ProductUpdate, Review};
use crate::utils::time::now_ms;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

const PRODUCT_TABLE: &str = "product";

#[derive(Clone)]
pub struct ProductRepository {
    base: BaseRepository,
}

/// Merge payload for partial updates, stamps `updated_at`
#[derive(Serialize)]
struct ProductMerge {
    #[serde(flatten)]
    data: ProductUpdate,
    updated_at: i64,
}

impl ProductRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all products, newest first
    pub async fn find_all(&self) -> RepoResult<Vec<Product>> {
        let products: Vec<Product> = self
            .base
            .db()
            .query("SELECT * FROM product ORDER BY created_at DESC")
            .await?
            .take(0)?;
        Ok(products)
    }

    /// Find product by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Product>> {
        let product: Option<Product> =
            self.base.db().select(record_id(PRODUCT_TABLE, id)).await?;
        Ok(product)
    }

    /// Create a new product with an empty pool
    pub async fn create(&self, data: ProductCreate) -> RepoResult<Product> {
        let now = now_ms();
        let product = Product {
            id: None,
            name: data.name,
            price: data.price,
            description: data.description,
            image: data.image,
            category: data.category,
            brand: data.brand,
            rating: 0.0,
            num_reviews: 0,
            stock: 0,
            accounts: Vec::new(),
            reviews: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let created: Option<Product> = self
            .base
            .db()
            .create(PRODUCT_TABLE)
            .content(product)
            .await?;
        created.ok_or_else(|| RepoError::Database("Failed to create product".to_string()))
    }

    /// Update product metadata (never touches the pool or stock)
    pub async fn update(&self, id: &str, data: ProductUpdate) -> RepoResult<Option<Product>> {
        let merge = ProductMerge {
            data,
            updated_at: now_ms(),
        };
        let updated: Option<Product> = self
            .base
            .db()
            .query("UPDATE $product MERGE $data RETURN AFTER")
            .bind(("product", record_id(PRODUCT_TABLE, id)))
            .bind(("data", merge))
            .await?
            .take(0)?;
        Ok(updated)
    }

    /// Delete a product
    pub async fn delete(&self, id: &str) -> RepoResult<Option<Product>> {
        let deleted: Option<Product> =
            self.base.db().delete(record_id(PRODUCT_TABLE, id)).await?;
        Ok(deleted)
    }

    /// Append credential units to the pool, bumping stock by the batch size
    pub async fn add_accounts(
        &self,
        id: &str,
        units: Vec<CredentialAccount>,
    ) -> RepoResult<Option<Product>> {
        let count = units.len() as i64;
        let updated: Option<Product> = self
            .base
            .db()
            .query(
                "UPDATE $product \
                 SET accounts = array::concat(accounts, $units), \
                     stock = stock + $count, \
                     updated_at = $now \
                 RETURN AFTER",
            )
            .bind(("product", record_id(PRODUCT_TABLE, id)))
            .bind(("units", units))
            .bind(("count", count))
            .bind(("now", now_ms()))
            .await?
            .take(0)?;
        Ok(updated)
    }

    /// Withdraw `quantity` units from the head of the pool.
    ///
    /// One conditional statement: it only fires when the pool still holds at
    /// least `quantity` units, and returns the pre-update record so the
    /// caller can capture the withdrawn units and the price snapshot.
    /// `None` means the condition did not hold (or the product is gone).
    pub async fn withdraw_accounts(
        &self,
        product: &RecordId,
        quantity: u32,
    ) -> RepoResult<Option<Product>> {
        let qty = i64::from(quantity);
        let before: Option<Product> = self
            .base
            .db()
            .query(
                "UPDATE $product \
                 SET accounts = array::slice(accounts, $qty), \
                     stock = stock - $qty, \
                     updated_at = $now \
                 WHERE stock >= $qty AND array::len(accounts) >= $qty \
                 RETURN BEFORE",
            )
            .bind(("product", product.clone()))
            .bind(("qty", qty))
            .bind(("now", now_ms()))
            .await?
            .take(0)?;
        Ok(before)
    }

    /// Return previously withdrawn units to the pool.
    ///
    /// `false` means the product no longer exists; the caller decides how
    /// loudly to complain.
    pub async fn return_accounts(
        &self,
        product: &RecordId,
        units: &[CredentialAccount],
    ) -> RepoResult<bool> {
        let count = units.len() as i64;
        let updated: Option<Product> = self
            .base
            .db()
            .query(
                "UPDATE $product \
                 SET accounts = array::concat(accounts, $units), \
                     stock = stock + $count, \
                     updated_at = $now \
                 RETURN AFTER",
            )
            .bind(("product", product.clone()))
            .bind(("units", units.to_vec()))
            .bind(("count", count))
            .bind(("now", now_ms()))
            .await?
            .take(0)?;
        Ok(updated.is_some())
    }

    /// Replace the review list and the derived rating fields
    pub async fn save_reviews(
        &self,
        id: &str,
        reviews: Vec<Review>,
        rating: f64,
        num_reviews: u32,
    ) -> RepoResult<Option<Product>> {
        let updated: Option<Product> = self
            .base
            .db()
            .query(
                "UPDATE $product \
                 SET reviews = $reviews, \
                     rating = $rating, \
                     num_reviews = $num, \
                     updated_at = $now \
                 RETURN AFTER",
            )
            .bind(("product", record_id(PRODUCT_TABLE, id)))
            .bind(("reviews", reviews))
            .bind(("rating", rating))
            .bind(("num", i64::from(num_reviews)))
            .bind(("now", now_ms()))
            .await?
            .take(0)?;
        Ok(updated)
    }
}
