use super::*;

use futures::future::join_all;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_never_oversell() {
    let ctx = ctx().await;
    let product = seed_product(&ctx.db, "netmovies", 10, 4).await;

    // 8 buyers race for 4 units, one each
    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let engine = ctx.engine.clone();
            let product = product.clone();
            tokio::spawn(async move {
                engine
                    .checkout(&format!("user:{i}"), &[line(&product, 1)], None)
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let winners: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
    let losers = results
        .iter()
        .filter(|r| matches!(r, Err(EngineError::InsufficientStock { .. })))
        .count();
    assert_eq!(winners.len(), 4, "exactly one winner per available unit");
    assert_eq!(losers, 4);

    // No unit was assigned twice
    let mut assigned = std::collections::HashSet::new();
    for result in &results {
        if let Ok(order) = result {
            for unit in &order.items[0].accounts {
                assert!(
                    assigned.insert(unit.email.clone()),
                    "unit {} assigned to two orders",
                    unit.email
                );
            }
        }
    }
    assert_eq!(assigned.len(), 4);

    let (stock, pool, _) = pool_state(&ctx.db, &product).await;
    assert_eq!(stock, 0);
    assert_eq!(pool, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_quantity_two() {
    let ctx = ctx().await;
    // 5 units, 4 buyers of 2 each: floor(5/2) = 2 winners, one unit left
    let product = seed_product(&ctx.db, "netmovies", 10, 5).await;

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let engine = ctx.engine.clone();
            let product = product.clone();
            tokio::spawn(async move {
                engine
                    .checkout(&format!("user:{i}"), &[line(&product, 2)], None)
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 2);

    let (stock, pool, _) = pool_state(&ctx.db, &product).await;
    assert_eq!(stock, 1);
    assert_eq!(pool, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pay_and_sweep_race_has_one_winner() {
    // Zero hold: the order is expired the moment it exists
    let ctx = ctx_with_hold(0).await;
    let product = seed_product(&ctx.db, "netmovies", 10, 1).await;

    let order = ctx
        .engine
        .checkout("user:1", &[line(&product, 1)], None)
        .await
        .unwrap();
    let order_id = order.id_string();
    let deadline = order.payment_expires_at;

    let pay_engine = ctx.engine.clone();
    let pay_id = order_id.clone();
    let pay_task = tokio::spawn(async move { pay_engine.pay(&pay_id).await });

    let sweep_engine = ctx.engine.clone();
    let sweep_task =
        tokio::spawn(async move { sweep_engine.sweep_expired(deadline + 1).await });

    let pay_result = pay_task.await.unwrap();
    let swept = sweep_task.await.unwrap().unwrap();

    let persisted = OrderRepository::new(ctx.db.clone())
        .find_by_id(&order_id)
        .await
        .unwrap()
        .unwrap();
    let (stock, pool, _) = pool_state(&ctx.db, &product).await;

    match (&pay_result, swept) {
        // Pay won: the sweep must not have cancelled or returned anything
        (Ok(paid), 0) => {
            assert_eq!(paid.status, OrderStatus::Completed);
            assert_eq!(persisted.status, OrderStatus::Completed);
            assert_eq!((stock, pool), (0, 0));
        }
        // Sweep won: pay must have observed the cancelled state
        (Err(EngineError::OrderNotPending { actual }), 1) => {
            assert_eq!(*actual, OrderStatus::Cancelled);
            assert_eq!(persisted.status, OrderStatus::Cancelled);
            assert_eq!((stock, pool), (1, 1));
        }
        other => panic!("exactly one of pay/sweep must win, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_coupon_uses_bounded() {
    let ctx = ctx().await;
    let product = seed_product(&ctx.db, "netmovies", 100, 10).await;
    seed_coupon(
        &ctx.db,
        "LIMITED",
        DiscountType::Percentage,
        50,
        3,
        far_future(),
    )
    .await;

    let tasks: Vec<_> = (0..6)
        .map(|i| {
            let engine = ctx.engine.clone();
            let product = product.clone();
            tokio::spawn(async move {
                engine
                    .checkout(&format!("user:{i}"), &[line(&product, 1)], Some("LIMITED"))
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let discounted = results
        .iter()
        .filter(|r| matches!(r, Ok(order) if order.total_price == Decimal::from(50)))
        .count();
    let exhausted = results
        .iter()
        .filter(|r| matches!(r, Err(EngineError::CouponExhausted(_))))
        .count();
    assert_eq!(discounted, 3, "max_uses bounds concurrent consumption");
    assert_eq!(exhausted, 3);

    let coupon = CouponRepository::new(ctx.db.clone())
        .find_by_code("LIMITED")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(coupon.used_count, 3);

    // The three losers rolled their units back: 10 - 3 = 7 remain
    let (stock, pool, _) = pool_state(&ctx.db, &product).await;
    assert_eq!(stock, 7);
    assert_eq!(pool, 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sweeps_return_units_once() {
    let ctx = ctx_with_hold(0).await;
    let product = seed_product(&ctx.db, "netmovies", 10, 2).await;

    let order = ctx
        .engine
        .checkout("user:1", &[line(&product, 2)], None)
        .await
        .unwrap();
    let deadline = order.payment_expires_at;

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let engine = ctx.engine.clone();
            tokio::spawn(async move { engine.sweep_expired(deadline + 1).await })
        })
        .collect();

    let total: usize = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .sum();
    assert_eq!(total, 1, "one sweep claims, the rest skip");

    let (stock, pool, _) = pool_state(&ctx.db, &product).await;
    assert_eq!(stock, 2);
    assert_eq!(pool, 2);
}
