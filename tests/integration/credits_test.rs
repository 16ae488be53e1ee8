use crate::common::{
    assert_conservation, authorized_pool, ledger, new_order, set_pool_created_at, setup_test_db,
    unique_user, ADMIN, CASHIER,
};
use credit_ledger::LedgerError;
use entity::sea_orm_active_enums::OrderStatus;
use time::macros::datetime;

#[tokio::test]
async fn test_consumption_is_fifo() {
    let db = setup_test_db().await;
    let ledger = ledger(&db);
    let user_id = unique_user();

    // Authorize the newer pool first so insertion order cannot mask FIFO
    let (_, p2) = authorized_pool(&ledger, &user_id, 3).await;
    let (_, p1) = authorized_pool(&ledger, &user_id, 2).await;
    set_pool_created_at(&db, p1.id, datetime!(2020-01-01 00:00:00 UTC)).await;
    set_pool_created_at(&db, p2.id, datetime!(2020-01-01 00:00:01 UTC)).await;

    let mut drawn = Vec::new();
    for i in 0..3 {
        let receipt = ledger
            .consumption
            .consume(&user_id, &format!("estimate-{}", i), "duty estimate")
            .await
            .unwrap();
        drawn.push(receipt.pool_id);
    }

    assert_eq!(drawn, vec![p1.id, p1.id, p2.id]);

    let p1 = ledger.pools.get_pool(p1.id).await.unwrap();
    let p2 = ledger.pools.get_pool(p2.id).await.unwrap();
    assert_eq!(p1.remaining_credits, 0);
    assert_eq!(p2.remaining_credits, 2);

    assert_conservation(&db, p1.id).await;
    assert_conservation(&db, p2.id).await;
}

#[tokio::test]
async fn test_exhausted_pool_falls_through() {
    let db = setup_test_db().await;
    let ledger = ledger(&db);
    let user_id = unique_user();

    let (_, p1) = authorized_pool(&ledger, &user_id, 1).await;
    let (_, p2) = authorized_pool(&ledger, &user_id, 1).await;
    set_pool_created_at(&db, p1.id, datetime!(2020-01-01 00:00:00 UTC)).await;
    set_pool_created_at(&db, p2.id, datetime!(2020-01-02 00:00:00 UTC)).await;

    let first = ledger.consumption.consume(&user_id, "a", "estimate").await.unwrap();
    let second = ledger.consumption.consume(&user_id, "b", "estimate").await.unwrap();
    assert_eq!(first.pool_id, p1.id);
    assert_eq!(second.pool_id, p2.id);

    let third = ledger.consumption.consume(&user_id, "c", "estimate").await;
    assert!(matches!(third, Err(LedgerError::NoCreditsAvailable(_))));
    assert!(!ledger.consumption.has_available_credits(&user_id).await.unwrap());
}

#[tokio::test]
async fn test_no_pools_means_no_credits() {
    let db = setup_test_db().await;
    let ledger = ledger(&db);
    let user_id = unique_user();

    // A pending order grants nothing
    ledger
        .orders
        .create_order(new_order(&user_id, 10))
        .await
        .unwrap();

    assert!(!ledger.consumption.has_available_credits(&user_id).await.unwrap());
    let result = ledger.consumption.consume(&user_id, "a", "estimate").await;
    assert!(matches!(result, Err(LedgerError::NoCreditsAvailable(_))));

    let status = ledger.consumption.get_credit_status(&user_id).await.unwrap();
    assert_eq!(status.total_credits, 0);
    assert_eq!(status.active_pools, 0);
}

#[tokio::test]
async fn test_consume_rejects_missing_subject() {
    let db = setup_test_db().await;
    let ledger = ledger(&db);
    let user_id = unique_user();
    let (_, pool) = authorized_pool(&ledger, &user_id, 1).await;

    let result = ledger.consumption.consume(&user_id, "", "estimate").await;
    assert!(matches!(result, Err(LedgerError::BadRequest(_))));

    let pool = ledger.pools.get_pool(pool.id).await.unwrap();
    assert_eq!(pool.remaining_credits, 1);
}

#[tokio::test]
async fn test_pools_are_isolated_per_user() {
    let db = setup_test_db().await;
    let ledger = ledger(&db);
    let alice = unique_user();
    let bob = unique_user();

    authorized_pool(&ledger, &alice, 2).await;

    let result = ledger.consumption.consume(&bob, "a", "estimate").await;
    assert!(matches!(result, Err(LedgerError::NoCreditsAvailable(_))));
    assert!(ledger.pools.list_pools_for_user(&bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_credit_status_aggregates_pools() {
    let db = setup_test_db().await;
    let ledger = ledger(&db);
    let user_id = unique_user();

    authorized_pool(&ledger, &user_id, 5).await;
    authorized_pool(&ledger, &user_id, 3).await;

    ledger.consumption.consume(&user_id, "a", "estimate").await.unwrap();
    ledger.consumption.consume(&user_id, "b", "estimate").await.unwrap();

    let status = ledger.consumption.get_credit_status(&user_id).await.unwrap();
    assert_eq!(status.total_credits, 8);
    assert_eq!(status.remaining_credits, 6);
    assert_eq!(status.used_credits, 2);
    assert_eq!(status.active_pools, 2);
    assert!(ledger.consumption.has_available_credits(&user_id).await.unwrap());
}

#[tokio::test]
async fn test_deactivated_pool_is_skipped() {
    let db = setup_test_db().await;
    let ledger = ledger(&db);
    let user_id = unique_user();

    let (_, p1) = authorized_pool(&ledger, &user_id, 4).await;
    let (_, p2) = authorized_pool(&ledger, &user_id, 2).await;
    set_pool_created_at(&db, p1.id, datetime!(2020-01-01 00:00:00 UTC)).await;
    set_pool_created_at(&db, p2.id, datetime!(2020-01-02 00:00:00 UTC)).await;

    let result = ledger.pools.deactivate_pool(p1.id, CASHIER, None).await;
    assert!(matches!(result, Err(LedgerError::PermissionDenied(_))));

    let deactivated = ledger
        .pools
        .deactivate_pool(p1.id, ADMIN, Some("refunded"))
        .await
        .unwrap();
    assert!(!deactivated.is_active);
    assert_eq!(deactivated.remaining_credits, 4);
    assert_eq!(deactivated.deactivation_reason.as_deref(), Some("refunded"));
    assert!(deactivated.deactivated_at.is_some());

    // Idempotent: the original stamp is kept
    let again = ledger
        .pools
        .deactivate_pool(p1.id, ADMIN, Some("second refund"))
        .await
        .unwrap();
    assert_eq!(again.deactivation_reason.as_deref(), Some("refunded"));
    assert_eq!(again.deactivated_at, deactivated.deactivated_at);

    let receipt = ledger.consumption.consume(&user_id, "a", "estimate").await.unwrap();
    assert_eq!(receipt.pool_id, p2.id);

    let status = ledger.consumption.get_credit_status(&user_id).await.unwrap();
    assert_eq!(status.total_credits, 2);
    assert_eq!(status.remaining_credits, 1);
    assert_eq!(status.deactivated_remaining_credits, 4);

    let p1 = ledger.pools.get_pool(p1.id).await.unwrap();
    assert_eq!(p1.remaining_credits, 4);
}

#[tokio::test]
async fn test_receipts_trace_back_to_order() {
    let db = setup_test_db().await;
    let ledger = ledger(&db);
    let user_id = unique_user();

    let (order, pool) = authorized_pool(&ledger, &user_id, 3).await;

    let receipt = ledger
        .consumption
        .consume(&user_id, "declaration-42", "import duty estimate")
        .await
        .unwrap();
    assert_eq!(receipt.user_id, user_id);
    assert_eq!(receipt.pool_id, pool.id);
    assert_eq!(receipt.order_id, order.id);
    assert_eq!(receipt.order_number, order.order_number);
    assert_eq!(receipt.label, "import duty estimate");

    let found = ledger
        .consumption
        .receipts_for_subject(&user_id, "declaration-42")
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, receipt.id);

    // Every call is a fresh debit, even for the same subject
    ledger
        .consumption
        .consume(&user_id, "declaration-42", "import duty estimate")
        .await
        .unwrap();
    let found = ledger
        .consumption
        .receipts_for_subject(&user_id, "declaration-42")
        .await
        .unwrap();
    assert_eq!(found.len(), 2);

    let usages = ledger.pools.list_usages_for_pool(pool.id).await.unwrap();
    assert_eq!(usages.len(), 2);
    assert_conservation(&db, pool.id).await;
}

#[tokio::test]
async fn test_direct_pool_creation_is_exactly_once() {
    let db = setup_test_db().await;
    let ledger = ledger(&db);
    let user_id = unique_user();

    let (order, pool) = authorized_pool(&ledger, &user_id, 2).await;

    let result = ledger.pools.create_pool_from_order(&order).await;
    assert!(matches!(result, Err(LedgerError::DuplicatePool(id)) if id == order.id));

    let pools = ledger.pools.list_pools_for_user(&user_id).await.unwrap();
    assert_eq!(pools.len(), 1);
    assert_eq!(pools[0].id, pool.id);
}

#[tokio::test]
async fn test_pool_requires_authorized_order() {
    let db = setup_test_db().await;
    let ledger = ledger(&db);
    let user_id = unique_user();

    let order = ledger
        .orders
        .create_order(new_order(&user_id, 2))
        .await
        .unwrap();
    let validated = ledger
        .orders
        .transition(order.id, OrderStatus::Validated, CASHIER, None)
        .await
        .unwrap();

    let result = ledger.pools.create_pool_from_order(&validated).await;
    assert!(matches!(result, Err(LedgerError::InvalidTransition(_))));
    assert!(ledger.pools.get_pool_for_order(order.id).await.unwrap().is_none());
}
