//! Concurrency tests for the credit ledger
//!
//! Concurrent debits against the same pool and concurrent authorizations of
//! the same order must never over-spend or double-grant.

use crate::common::{
    assert_conservation, authorized_pool, freeze_pools_for, ledger, new_order,
    pool_count_for_order, setup_test_db, unique_user, ADMIN, CASHIER,
};
use credit_ledger::LedgerError;
use entity::sea_orm_active_enums::OrderStatus;
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_consume_of_last_credit() {
    let db = setup_test_db().await;
    let ledger = Arc::new(ledger(&db));
    let user_id = unique_user();

    let (_, pool) = authorized_pool(&ledger, &user_id, 1).await;

    let mut tasks = JoinSet::new();
    for i in 0..10 {
        let ledger = ledger.clone();
        let user_id = user_id.clone();

        tasks.spawn(async move {
            let result = ledger
                .consumption
                .consume(&user_id, &format!("subject-{}", i), "estimate")
                .await;
            (i, result)
        });
    }

    let mut success_count = 0;
    let mut exhausted_count = 0;
    let mut other_errors = Vec::new();

    while let Some(joined) = tasks.join_next().await {
        let (i, result) = joined.expect("Task panicked");
        match result {
            Ok(_) => success_count += 1,
            Err(LedgerError::NoCreditsAvailable(_)) => exhausted_count += 1,
            Err(e) => other_errors.push(format!("Request {}: {:?}", i, e)),
        }
    }

    assert!(other_errors.is_empty(), "Unexpected errors: {:?}", other_errors);
    assert_eq!(success_count, 1, "Exactly one debit should win");
    assert_eq!(exhausted_count, 9);

    let pool = ledger.pools.get_pool(pool.id).await.unwrap();
    assert_eq!(pool.remaining_credits, 0);
    assert_conservation(&db, pool.id).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_consume_across_pools() {
    let db = setup_test_db().await;
    let ledger = Arc::new(ledger(&db));
    let user_id = unique_user();

    let (_, p1) = authorized_pool(&ledger, &user_id, 3).await;
    let (_, p2) = authorized_pool(&ledger, &user_id, 2).await;

    let mut tasks = JoinSet::new();
    for i in 0..8 {
        let ledger = ledger.clone();
        let user_id = user_id.clone();

        tasks.spawn(async move {
            ledger
                .consumption
                .consume(&user_id, &format!("subject-{}", i), "estimate")
                .await
        });
    }

    let mut success_count = 0;
    let mut exhausted_count = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.expect("Task panicked") {
            Ok(_) => success_count += 1,
            Err(LedgerError::NoCreditsAvailable(_)) => exhausted_count += 1,
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    assert_eq!(success_count, 5);
    assert_eq!(exhausted_count, 3);

    assert_conservation(&db, p1.id).await;
    assert_conservation(&db, p2.id).await;

    let status = ledger.consumption.get_credit_status(&user_id).await.unwrap();
    assert_eq!(status.remaining_credits, 0);
    assert_eq!(status.used_credits, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_authorization_grants_one_pool() {
    let db = setup_test_db().await;
    let ledger = Arc::new(ledger(&db));
    let user_id = unique_user();

    let order = ledger
        .orders
        .create_order(new_order(&user_id, 5))
        .await
        .unwrap();
    ledger
        .orders
        .transition(order.id, OrderStatus::Validated, CASHIER, None)
        .await
        .unwrap();

    let attempts = (0..5).map(|_| {
        let ledger = ledger.clone();
        let order_id = order.id;

        tokio::spawn(async move {
            ledger
                .orders
                .transition(order_id, OrderStatus::Authorized, ADMIN, None)
                .await
        })
    });

    let mut success_count = 0;
    let mut rejected_count = 0;
    for joined in join_all(attempts).await {
        match joined.expect("Task panicked") {
            Ok(_) => success_count += 1,
            Err(LedgerError::InvalidTransition(_)) => rejected_count += 1,
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    assert_eq!(success_count, 1, "Exactly one authorization should win");
    assert_eq!(rejected_count, 4);
    assert_eq!(pool_count_for_order(&db, order.id).await, 1);

    let pools = ledger.pools.list_pools_for_user(&user_id).await.unwrap();
    assert_eq!(pools.len(), 1);
    assert_eq!(pools[0].total_credits, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_consume_never_overspends() {
    let db = setup_test_db().await;
    let ledger = Arc::new(ledger(&db));
    let user_id = unique_user();

    let (_, pool) = authorized_pool(&ledger, &user_id, 3).await;

    let mut tasks = JoinSet::new();
    for i in 0..10 {
        let ledger = ledger.clone();
        let user_id = user_id.clone();

        tasks.spawn(async move {
            ledger
                .consumption
                .consume(&user_id, &format!("subject-{}", i), "estimate")
                .await
        });
    }

    let mut success_count = 0;
    let mut other_errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined.expect("Task panicked") {
            Ok(_) => success_count += 1,
            Err(LedgerError::NoCreditsAvailable(_)) => {}
            Err(e) => other_errors.push(format!("{:?}", e)),
        }
    }

    assert!(other_errors.is_empty(), "Unexpected errors: {:?}", other_errors);
    assert_eq!(success_count, 3);

    let pool = ledger.pools.get_pool(pool.id).await.unwrap();
    assert_eq!(pool.remaining_credits, 0);
    assert_conservation(&db, pool.id).await;
}

#[tokio::test]
async fn test_consume_gives_up_after_retry_limit() {
    let db = setup_test_db().await;
    let ledger = ledger(&db);
    let user_id = unique_user();

    let (_, pool) = authorized_pool(&ledger, &user_id, 2).await;

    // Every guarded decrement now loses, as if another debit always got there first
    freeze_pools_for(&db, &user_id).await;

    let result = ledger.consumption.consume(&user_id, "subject-1", "estimate").await;
    match result {
        Err(e @ LedgerError::Contention(_)) => assert!(e.is_transient()),
        other => panic!("Expected contention, got {:?}", other),
    }

    let pool = ledger.pools.get_pool(pool.id).await.unwrap();
    assert_eq!(pool.remaining_credits, 2);
    assert!(ledger
        .consumption
        .receipts_for_subject(&user_id, "subject-1")
        .await
        .unwrap()
        .is_empty());
    assert_conservation(&db, pool.id).await;
}
