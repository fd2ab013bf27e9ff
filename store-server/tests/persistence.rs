//! Smoke test for the on-disk database path.
//! Run: cargo test -p store-server --test persistence

use rust_decimal::Decimal;
use store_server::db::DbService;
use store_server::db::models::ProductCreate;
use store_server::db::repository::ProductRepository;

#[tokio::test]
async fn test_rocksdb_roundtrip() {
    let tmp = tempfile::tempdir().unwrap();
    let service = DbService::new(tmp.path()).await.unwrap();

    let repo = ProductRepository::new(service.db.clone());
    let created = repo
        .create(ProductCreate {
            name: "netmovies".to_string(),
            price: Decimal::from(10),
            description: "1 month".to_string(),
            image: String::new(),
            category: "streaming".to_string(),
            brand: "acme".to_string(),
        })
        .await
        .unwrap();
    assert!(created.id.is_some());
    assert_eq!(created.stock, 0);

    let all = repo.find_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "netmovies");
    assert_eq!(all[0].price, Decimal::from(10));
}
