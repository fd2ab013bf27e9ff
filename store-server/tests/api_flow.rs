//! End-to-end API tests against an in-process router with an in-memory
//! database. Run: cargo test -p store-server --test api_flow

use axum::Router;
use axum::body::Body;
use axum::middleware;
use http::StatusCode;
use serde_json::{Value, json};
use tower::Service;

use store_server::auth::{JwtConfig, require_auth};
use store_server::core::{Config, ServerState};
use store_server::db::DbService;
use store_server::db::models::{User, UserRole};
use store_server::db::repository::UserRepository;

fn test_config() -> Config {
    Config {
        work_dir: "unused-in-memory".to_string(),
        http_port: 0,
        jwt: JwtConfig {
            secret: "integration-test-secret-key-0123456789".to_string(),
            expiration_minutes: 60,
            issuer: "store-server".to_string(),
            audience: "store-clients".to_string(),
        },
        environment: "test".to_string(),
        payment_hold_minutes: 15,
        sweep_interval_secs: 60,
    }
}

async fn test_app() -> (Router, ServerState) {
    let db = DbService::new_memory().await.unwrap();
    let state = ServerState::with_db(test_config(), db.db);
    let app = store_server::routes::build_router()
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());
    (app, state)
}

/// Insert an admin directly and mint a token for it
async fn seed_admin(state: &ServerState) -> String {
    let repo = UserRepository::new(state.get_db());
    let admin = repo
        .create(User {
            id: None,
            username: "root".to_string(),
            email: "root@example.com".to_string(),
            full_name: "Root Admin".to_string(),
            phone_number: "+34600000000".to_string(),
            birth_date: "01/01/1980".to_string(),
            hash_pass: User::hash_password("rootpass1").unwrap(),
            role: UserRole::Admin,
            created_at: 0,
        })
        .await
        .unwrap();

    state
        .get_jwt_service()
        .generate_token(&admin.id_string(), "root", "admin")
        .unwrap()
}

async fn request(
    app: &mut Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = http::Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.call(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Create a product with a pool of `units` accounts, returns the product id
async fn seed_product_via_api(
    app: &mut Router,
    admin_token: &str,
    name: &str,
    price: i64,
    units: usize,
) -> String {
    let (status, product) = request(
        app,
        "POST",
        "/api/products",
        Some(admin_token),
        Some(json!({
            "name": name,
            "price": price,
            "description": format!("{name} subscription"),
            "category": "streaming",
            "brand": "acme",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = product["id"].as_str().unwrap().to_string();

    if units > 0 {
        let accounts: Vec<Value> = (0..units)
            .map(|i| json!({"email": format!("{name}-{i}@mail.test"), "secret": format!("pw-{i}")}))
            .collect();
        let (status, uploaded) = request(
            app,
            "POST",
            &format!("/api/products/{id}/accounts"),
            Some(admin_token),
            Some(json!({"accounts": accounts})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(uploaded["stock"].as_u64().unwrap() as usize, units);
    }

    id
}

/// Register and log in a buyer, returns (token, user id)
async fn register_buyer(app: &mut Router, username: &str) -> (String, String) {
    let (status, _) = request(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "full_name": "Jane Buyer",
            "email": format!("{username}@example.com"),
            "username": username,
            "password": "buyerpass1",
            "phone_number": "+34611111111",
            "birth_date": "24/12/1995",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, login) = request(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": username, "password": "buyerpass1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (
        login["token"].as_str().unwrap().to_string(),
        login["user"]["id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_full_purchase_flow() {
    let (mut app, state) = test_app().await;
    let admin_token = seed_admin(&state).await;

    let product = seed_product_via_api(&mut app, &admin_token, "netmovies", 10, 2).await;
    let (buyer_token, buyer_id) = register_buyer(&mut app, "jane").await;

    // Checkout both units
    let (status, order) = request(
        &mut app,
        "POST",
        "/api/orders",
        Some(&buyer_token),
        Some(json!({"items": [{"product": product, "quantity": 2}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["user"], buyer_id);
    assert_eq!(order["total_price"].as_f64().unwrap(), 20.0);
    // Units are hidden while pending
    assert_eq!(order["items"][0]["accounts"].as_array().unwrap().len(), 0);
    let order_id = order["id"].as_str().unwrap().to_string();

    // The public catalog shows the drained stock and never a secret
    let (status, catalog) = request(&mut app, "GET", "/api/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(catalog[0]["stock"].as_u64().unwrap(), 0);
    assert!(!catalog.to_string().contains("secret"));
    assert!(!catalog.to_string().contains("accounts"));

    // Pay: the only path that reveals the units
    let (status, paid) = request(
        &mut app,
        "PUT",
        &format!("/api/orders/{order_id}/pay"),
        Some(&buyer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "completed");
    assert_eq!(paid["items"][0]["accounts"].as_array().unwrap().len(), 2);

    // my-orders shows the completed order with its units
    let (status, mine) = request(
        &mut app,
        "GET",
        "/api/orders/my-orders",
        Some(&buyer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["items"][0]["accounts"].as_array().unwrap().len(), 2);

    // Paying again conflicts
    let (status, body) = request(
        &mut app,
        "PUT",
        &format!("/api/orders/{order_id}/pay"),
        Some(&buyer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"].as_u64().unwrap(), 4003);
}

#[tokio::test]
async fn test_authentication_boundaries() {
    let (mut app, _state) = test_app().await;

    // Catalog browsing is public
    let (status, _) = request(&mut app, "GET", "/api/products", None, None).await;
    assert_eq!(status, StatusCode::OK);

    // Checkout is not
    let (status, body) = request(
        &mut app,
        "POST",
        "/api/orders",
        None,
        Some(json!({"items": []})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"].as_u64().unwrap(), 1001);

    // Garbage tokens are rejected
    let (status, _) = request(
        &mut app,
        "GET",
        "/api/orders/my-orders",
        Some("not-a-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_gating() {
    let (mut app, state) = test_app().await;
    let admin_token = seed_admin(&state).await;
    let (buyer_token, _) = register_buyer(&mut app, "lowpriv").await;

    // A buyer cannot manage the catalog
    let (status, body) = request(
        &mut app,
        "POST",
        "/api/products",
        Some(&buyer_token),
        Some(json!({"name": "x", "price": 1, "description": "y"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"].as_u64().unwrap(), 2002);

    // Nor list all orders or trigger the sweep
    let (status, _) = request(&mut app, "GET", "/api/orders", Some(&buyer_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = request(
        &mut app,
        "PUT",
        "/api/orders/check-expired-orders",
        Some(&buyer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The admin can do all three
    let product = seed_product_via_api(&mut app, &admin_token, "musicbox", 5, 0).await;
    assert!(product.starts_with("product:"));
    let (status, _) = request(&mut app, "GET", "/api/orders", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, sweep) = request(
        &mut app,
        "PUT",
        "/api/orders/check-expired-orders",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sweep["cancelled"].as_u64().unwrap(), 0);
}

#[tokio::test]
async fn test_checkout_insufficient_stock() {
    let (mut app, state) = test_app().await;
    let admin_token = seed_admin(&state).await;
    let product = seed_product_via_api(&mut app, &admin_token, "netmovies", 10, 1).await;
    let (buyer_token, _) = register_buyer(&mut app, "greedy").await;

    let (status, body) = request(
        &mut app,
        "POST",
        "/api/orders",
        Some(&buyer_token),
        Some(json!({"items": [{"product": product, "quantity": 2}]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"].as_u64().unwrap(), 4004);

    // Nothing was reserved
    let (_, catalog) = request(&mut app, "GET", "/api/products", None, None).await;
    assert_eq!(catalog[0]["stock"].as_u64().unwrap(), 1);
}

#[tokio::test]
async fn test_buyer_cannot_pay_someone_elses_order() {
    let (mut app, state) = test_app().await;
    let admin_token = seed_admin(&state).await;
    let product = seed_product_via_api(&mut app, &admin_token, "netmovies", 10, 1).await;
    let (owner_token, _) = register_buyer(&mut app, "owner").await;
    let (thief_token, _) = register_buyer(&mut app, "thief").await;

    let (_, order) = request(
        &mut app,
        "POST",
        "/api/orders",
        Some(&owner_token),
        Some(json!({"items": [{"product": product, "quantity": 1}]})),
    )
    .await;
    let order_id = order["id"].as_str().unwrap();

    let (status, body) = request(
        &mut app,
        "PUT",
        &format!("/api/orders/{order_id}/pay"),
        Some(&thief_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"].as_u64().unwrap(), 2003);
}

#[tokio::test]
async fn test_admin_cancel_restores_stock() {
    let (mut app, state) = test_app().await;
    let admin_token = seed_admin(&state).await;
    let product = seed_product_via_api(&mut app, &admin_token, "netmovies", 10, 2).await;
    let (buyer_token, _) = register_buyer(&mut app, "waffler").await;

    let (_, order) = request(
        &mut app,
        "POST",
        "/api/orders",
        Some(&buyer_token),
        Some(json!({"items": [{"product": product, "quantity": 2}]})),
    )
    .await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, cancelled) = request(
        &mut app,
        "PUT",
        &format!("/api/orders/{order_id}/status"),
        Some(&admin_token),
        Some(json!({"status": "cancelled"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    // Units are back in the pool
    let (_, catalog) = request(&mut app, "GET", "/api/products", None, None).await;
    assert_eq!(catalog[0]["stock"].as_u64().unwrap(), 2);

    // Forcing it back to pending is rejected
    let (status, _) = request(
        &mut app,
        "PUT",
        &format!("/api/orders/{order_id}/status"),
        Some(&admin_token),
        Some(json!({"status": "pending"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reviews_flow() {
    let (mut app, state) = test_app().await;
    let admin_token = seed_admin(&state).await;
    let product = seed_product_via_api(&mut app, &admin_token, "netmovies", 10, 0).await;
    let (buyer_token, _) = register_buyer(&mut app, "critic").await;

    let (status, reviewed) = request(
        &mut app,
        "POST",
        &format!("/api/products/{product}/reviews"),
        Some(&buyer_token),
        Some(json!({"rating": 4, "comment": "works fine"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["num_reviews"].as_u64().unwrap(), 1);
    assert_eq!(reviewed["rating"].as_f64().unwrap(), 4.0);

    // One review per user
    let (status, body) = request(
        &mut app,
        "POST",
        &format!("/api/products/{product}/reviews"),
        Some(&buyer_token),
        Some(json!({"rating": 5, "comment": "changed my mind"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"].as_u64().unwrap(), 6003);

    // But editing is allowed
    let (status, edited) = request(
        &mut app,
        "PUT",
        &format!("/api/products/{product}/reviews"),
        Some(&buyer_token),
        Some(json!({"rating": 2, "comment": "broke after a week"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["rating"].as_f64().unwrap(), 2.0);

    // And deleting clears the aggregates
    let (status, cleared) = request(
        &mut app,
        "DELETE",
        &format!("/api/products/{product}/reviews"),
        Some(&buyer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["num_reviews"].as_u64().unwrap(), 0);
    assert_eq!(cleared["rating"].as_f64().unwrap(), 0.0);
}

#[tokio::test]
async fn test_coupon_admin_and_checkout() {
    let (mut app, state) = test_app().await;
    let admin_token = seed_admin(&state).await;
    let product = seed_product_via_api(&mut app, &admin_token, "netmovies", 100, 3).await;
    let (buyer_token, _) = register_buyer(&mut app, "saver").await;

    let expires_at = chrono_far_future();
    let (status, _) = request(
        &mut app,
        "POST",
        "/api/coupons",
        Some(&admin_token),
        Some(json!({
            "code": "SAVE10",
            "discount_type": "percentage",
            "discount_value": 10,
            "expires_at": expires_at,
            "max_uses": 1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Duplicate code conflicts
    let (status, _) = request(
        &mut app,
        "POST",
        "/api/coupons",
        Some(&admin_token),
        Some(json!({
            "code": "SAVE10",
            "discount_type": "fixed",
            "discount_value": 5,
            "expires_at": expires_at,
            "max_uses": 1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Discounted checkout
    let (status, order) = request(
        &mut app,
        "POST",
        "/api/orders",
        Some(&buyer_token),
        Some(json!({
            "items": [{"product": product, "quantity": 1}],
            "coupon_code": "SAVE10",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["total_price"].as_f64().unwrap(), 90.0);

    // The single use is spent
    let (status, body) = request(
        &mut app,
        "POST",
        "/api/orders",
        Some(&buyer_token),
        Some(json!({
            "items": [{"product": product, "quantity": 1}],
            "coupon_code": "SAVE10",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"].as_u64().unwrap(), 5003);
}

fn chrono_far_future() -> i64 {
    chrono::Utc::now().timestamp_millis() + 86_400_000
}
