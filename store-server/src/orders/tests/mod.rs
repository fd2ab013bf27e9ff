use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::db::DbService;
use crate::db::models::{
    CouponCreate, CredentialAccount, DiscountType, OrderStatus, ProductCreate,
};
use crate::db::repository::{CouponRepository, OrderRepository, ProductRepository};
use crate::utils::time::now_ms;

use super::*;

mod test_concurrency;

pub(super) struct TestContext {
    pub db: Surreal<Db>,
    pub engine: Arc<ReservationEngine>,
}

async fn ctx() -> TestContext {
    ctx_with_hold(15).await
}

async fn ctx_with_hold(hold_minutes: i64) -> TestContext {
    let service = DbService::new_memory().await.unwrap();
    TestContext {
        db: service.db.clone(),
        engine: Arc::new(ReservationEngine::new(service.db, hold_minutes)),
    }
}

/// Seed a product with `units` credential accounts, returns its id string.
async fn seed_product(db: &Surreal<Db>, name: &str, price: i64, units: usize) -> String {
    let repo = ProductRepository::new(db.clone());
    let product = repo
        .create(ProductCreate {
            name: name.to_string(),
            price: Decimal::from(price),
            description: format!("{} subscription", name),
            image: String::new(),
            category: "streaming".to_string(),
            brand: "acme".to_string(),
        })
        .await
        .unwrap();

    let id = product.id_string();
    if units > 0 {
        let batch: Vec<CredentialAccount> = (0..units)
            .map(|i| CredentialAccount {
                email: format!("{}-{}@mail.test", name, i),
                secret: format!("pw-{}", i),
            })
            .collect();
        repo.add_accounts(&id, batch).await.unwrap();
    }
    id
}

async fn seed_coupon(
    db: &Surreal<Db>,
    code: &str,
    discount_type: DiscountType,
    value: i64,
    max_uses: u32,
    expires_at: i64,
) {
    let repo = CouponRepository::new(db.clone());
    repo.create(CouponCreate {
        code: code.to_string(),
        discount_type,
        discount_value: Decimal::from(value),
        expires_at,
        max_uses,
    })
    .await
    .unwrap();
}

/// Fetch (stock, pool size, pool emails) for invariant assertions.
async fn pool_state(db: &Surreal<Db>, product_id: &str) -> (u32, usize, HashSet<String>) {
    let repo = ProductRepository::new(db.clone());
    let product = repo.find_by_id(product_id).await.unwrap().unwrap();
    let emails = product.accounts.iter().map(|a| a.email.clone()).collect();
    (product.stock, product.accounts.len(), emails)
}

fn line(product: &str, quantity: u32) -> CartLine {
    CartLine {
        product: product.to_string(),
        quantity,
    }
}

fn far_future() -> i64 {
    now_ms() + 86_400_000
}
