//! Orchestrator tests with a real cache and a mocked store.
//!
//! The mock fails the test on any store call that was not announced, so each
//! test also pins down exactly which store calls an operation makes.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use pickup_point::cache::{Cache, OrderCache};
use pickup_point::clock::ManualClock;
use pickup_point::model::{AcceptOrder, Order, OrderId, PackageError, PackageType, RecipientId, ReturnRequest};
use pickup_point::service::{ErrorKind, OrderError, OrderService};
use pickup_point::store::mock::MockStore;
use pickup_point::store::{AccessMode, IsolationLevel, StoreError};
use ttl_cache::{CacheConfig, EvictionStrategy};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

struct Harness {
    mock: MockStore,
    cache: Arc<OrderCache>,
    clock: Arc<ManualClock>,
    service: OrderService,
}

fn harness() -> Harness {
    let mock = MockStore::new();
    let cache = Arc::new(
        OrderCache::new(CacheConfig::new(16, EvictionStrategy::Lru, StdDuration::from_secs(60))).unwrap(),
    );
    let clock = Arc::new(ManualClock::new(start()));
    let service = OrderService::new(Arc::new(mock.clone()), cache.clone(), clock.clone());
    Harness {
        mock,
        cache,
        clock,
        service,
    }
}

fn stored(id: i64, recipient: i64, storage_until: DateTime<Utc>) -> Order {
    Order {
        id: OrderId(id),
        recipient_id: RecipientId(recipient),
        weight: 2.0,
        cost: 50.0,
        package_cost: 5.0,
        package_type: PackageType::Standard,
        storage_until,
        issued_at: None,
        returned_at: None,
        hash: format!("hash-{id}"),
    }
}

fn issued(id: i64, recipient: i64, issued_at: DateTime<Utc>) -> Order {
    let mut order = stored(id, recipient, issued_at + Duration::days(5));
    order.issue(issued_at);
    order
}

fn accept_params(id: i64, package: &str, weight: f64) -> AcceptOrder {
    AcceptOrder {
        order_id: OrderId(id),
        recipient_id: RecipientId(1),
        storage_until: start() + Duration::hours(1),
        package_type: package.to_string(),
        weight,
        cost: 100.0,
    }
}

// =============================================================================
// accept_order_courier
// =============================================================================

#[tokio::test]
async fn accept_writes_through_to_cache() {
    let h = harness();
    h.mock.expect_create_order(OrderId(10)).return_ok(());

    let order = h.service.accept_order_courier(accept_params(10, "box", 5.0)).await.unwrap();

    assert_eq!(order.package_cost, 20.0);
    assert_eq!(h.cache.get(OrderId(10)), Some(order));
    h.mock.verify();
}

#[tokio::test]
async fn accept_maps_duplicate_id() {
    let h = harness();
    h.mock
        .expect_create_order(OrderId(10))
        .return_err(StoreError::AlreadyExists(OrderId(10)));

    let err = h.service.accept_order_courier(accept_params(10, "box", 5.0)).await.unwrap_err();

    assert!(matches!(err, OrderError::OrderExists(OrderId(10))));
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(h.cache.get(OrderId(10)).is_none());
    h.mock.verify();
}

#[tokio::test]
async fn accept_rejects_past_storage_time_before_store() {
    let h = harness();
    let mut params = accept_params(10, "box", 5.0);
    params.storage_until = start() - Duration::seconds(1);

    let err = h.service.accept_order_courier(params).await.unwrap_err();

    assert!(matches!(err, OrderError::StorageExpired { .. }));
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    h.mock.verify();
}

#[tokio::test]
async fn accept_checks_package_weight() {
    let h = harness();

    let err = h.service.accept_order_courier(accept_params(10, "box", 35.0)).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::Package(PackageError::WeightExceedsLimit { limit, .. }) if limit == 30.0
    ));
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);

    h.mock.expect_create_order(OrderId(10)).return_ok(());
    let order = h.service.accept_order_courier(accept_params(10, "film", 35.0)).await.unwrap();
    assert_eq!(order.package_type, PackageType::Film);
    h.mock.verify();
}

#[tokio::test]
async fn accept_rejects_unusable_cost_and_weight_before_store() {
    let h = harness();

    for cost in [-50.0, f64::NAN, f64::INFINITY] {
        let mut params = accept_params(10, "film", 1.0);
        params.cost = cost;
        let err = h.service.accept_order_courier(params).await.unwrap_err();
        assert!(matches!(err, OrderError::Package(PackageError::InvalidCost(_))));
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    }

    let err = h
        .service
        .accept_order_courier(accept_params(10, "film", f64::INFINITY))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Package(PackageError::NonPositiveWeight(_))));

    assert!(h.cache.get(OrderId(10)).is_none());
    h.mock.verify();
}

#[tokio::test]
async fn accept_wraps_backend_failure() {
    let h = harness();
    h.mock
        .expect_create_order(OrderId(10))
        .return_err(StoreError::backend("connection refused"));

    let err = h.service.accept_order_courier(accept_params(10, "", 1.0)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.to_string().starts_with("accept_order_courier:"));
    h.mock.verify();
}

// =============================================================================
// return_order_courier
// =============================================================================

#[tokio::test]
async fn return_reads_through_and_invalidates() {
    let h = harness();
    h.mock
        .expect_find_order_by_id(OrderId(3))
        .return_ok(stored(3, 1, start() - Duration::hours(1)));
    h.mock.expect_delete_order(OrderId(3)).return_ok(());

    h.service.return_order_courier(OrderId(3)).await.unwrap();

    assert!(h.cache.get(OrderId(3)).is_none());
    h.mock.verify();
}

#[tokio::test]
async fn return_refuses_order_still_in_storage() {
    let h = harness();
    h.cache.set(OrderId(3), stored(3, 1, start() + Duration::hours(1)));

    let err = h.service.return_order_courier(OrderId(3)).await.unwrap_err();

    assert!(matches!(err, OrderError::NotExpiredOrIssued(OrderId(3))));
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    h.mock.verify();
}

#[tokio::test]
async fn return_refuses_issued_order() {
    let h = harness();
    let mut order = issued(3, 1, start() - Duration::days(1));
    order.storage_until = start() - Duration::hours(1);
    h.cache.set(OrderId(3), order);

    let err = h.service.return_order_courier(OrderId(3)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    h.mock.verify();
}

#[tokio::test]
async fn return_of_unknown_order_is_not_found() {
    let h = harness();
    h.mock.expect_find_order_by_id(OrderId(3)).return_err(StoreError::NotFound);

    let err = h.service.return_order_courier(OrderId(3)).await.unwrap_err();

    assert!(matches!(err, OrderError::OrderNotFound(OrderId(3))));
    h.mock.verify();
}

#[tokio::test]
async fn return_reports_concurrent_delete() {
    let h = harness();
    h.cache.set(OrderId(3), stored(3, 1, start() - Duration::hours(1)));
    h.mock.expect_delete_order(OrderId(3)).return_err(StoreError::NotFound);

    let err = h.service.return_order_courier(OrderId(3)).await.unwrap_err();

    assert!(matches!(err, OrderError::OrderVanished(OrderId(3))));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(h.cache.get(OrderId(3)).is_none(), "stale entry must be dropped");
    h.mock.verify();
}

#[tokio::test]
async fn return_wraps_store_outage() {
    let h = harness();
    h.mock
        .expect_find_order_by_id(OrderId(3))
        .return_err(StoreError::backend("timeout"));

    let err = h.service.return_order_courier(OrderId(3)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.kind().is_retryable());
    assert!(err.to_string().contains("return_order_courier"));
    h.mock.verify();
}

// =============================================================================
// issue_order_client
// =============================================================================

#[tokio::test]
async fn issue_fetches_misses_in_one_batch_and_commits() {
    let h = harness();
    let deadline = start() + Duration::days(1);
    h.cache.set(OrderId(1), stored(1, 7, deadline));
    h.mock
        .expect_find_orders_by_ids(vec![OrderId(2), OrderId(3)])
        .return_ok(vec![stored(3, 7, deadline), stored(2, 7, deadline)]);
    h.mock.expect_transaction(IsolationLevel::RepeatableRead, AccessMode::ReadWrite);
    for id in 1..=3 {
        h.mock.expect_tx_update(OrderId(id)).return_ok(());
    }

    let orders = h
        .service
        .issue_order_client(&[OrderId(1), OrderId(2), OrderId(3)])
        .await
        .unwrap();

    let ids: Vec<_> = orders.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![OrderId(1), OrderId(2), OrderId(3)]);
    for order in &orders {
        assert_eq!(order.issued_at, Some(start()));
        assert_eq!(h.cache.get(order.id).unwrap().issued_at, Some(start()));
    }
    h.mock.verify();
}

#[tokio::test]
async fn issue_deduplicates_ids() {
    let h = harness();
    h.cache.set(OrderId(1), stored(1, 7, start() + Duration::days(1)));
    h.mock.expect_transaction(IsolationLevel::RepeatableRead, AccessMode::ReadWrite);
    h.mock.expect_tx_update(OrderId(1)).return_ok(());

    let orders = h.service.issue_order_client(&[OrderId(1), OrderId(1)]).await.unwrap();

    assert_eq!(orders.len(), 1);
    h.mock.verify();
}

#[tokio::test]
async fn issue_rolls_back_and_leaves_cache_untouched() {
    let h = harness();
    let deadline = start() + Duration::days(1);
    h.cache.set(OrderId(1), stored(1, 7, deadline));
    h.cache.set(OrderId(2), stored(2, 7, deadline));
    h.mock.expect_transaction(IsolationLevel::RepeatableRead, AccessMode::ReadWrite);
    h.mock.expect_tx_update(OrderId(1)).return_ok(());
    h.mock
        .expect_tx_update(OrderId(2))
        .return_err(StoreError::backend("could not serialize access"));

    let err = h
        .service
        .issue_order_client(&[OrderId(1), OrderId(2)])
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::Transaction(_)));
    assert_eq!(err.kind(), ErrorKind::Transactional);
    assert!(h.cache.get(OrderId(1)).unwrap().issued_at.is_none());
    assert!(h.cache.get(OrderId(2)).unwrap().issued_at.is_none());
    h.mock.verify();
}

#[tokio::test]
async fn issue_aggregates_every_failed_row() {
    let h = harness();
    let deadline = start() + Duration::days(1);
    h.cache.set(OrderId(1), stored(1, 7, deadline));
    h.cache.set(OrderId(2), stored(2, 7, deadline));
    h.mock.expect_transaction(IsolationLevel::RepeatableRead, AccessMode::ReadWrite);
    h.mock
        .expect_tx_update(OrderId(1))
        .return_err(StoreError::backend("deadlock detected"));
    h.mock
        .expect_tx_update(OrderId(2))
        .return_err(StoreError::backend("deadlock detected"));

    let err = h
        .service
        .issue_order_client(&[OrderId(1), OrderId(2)])
        .await
        .unwrap_err();

    match err {
        OrderError::Transaction(StoreError::Batch(failures)) => assert_eq!(failures.len(), 2),
        other => panic!("expected aggregated failure, got {other:?}"),
    }
    h.mock.verify();
}

#[tokio::test]
async fn issue_reports_order_deleted_mid_transaction() {
    let h = harness();
    let deadline = start() + Duration::days(1);
    h.cache.set(OrderId(1), stored(1, 7, deadline));
    h.cache.set(OrderId(2), stored(2, 7, deadline));
    h.mock.expect_transaction(IsolationLevel::RepeatableRead, AccessMode::ReadWrite);
    h.mock.expect_tx_update(OrderId(1)).return_ok(());
    h.mock.expect_tx_update(OrderId(2)).return_err(StoreError::NotFound);

    let err = h
        .service
        .issue_order_client(&[OrderId(1), OrderId(2)])
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::OrderVanished(OrderId(2))));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!err.kind().is_retryable());
    assert!(h.cache.get(OrderId(2)).is_none(), "stale entry must be dropped");
    assert!(h.cache.get(OrderId(1)).unwrap().issued_at.is_none());
    h.mock.verify();
}

#[tokio::test]
async fn issue_rejects_mixed_recipients() {
    let h = harness();
    let deadline = start() + Duration::days(1);
    h.cache.set(OrderId(1), stored(1, 7, deadline));
    h.cache.set(OrderId(2), stored(2, 8, deadline));

    let err = h
        .service
        .issue_order_client(&[OrderId(1), OrderId(2)])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OrderError::DifferentClients {
            expected: RecipientId(7),
            found: RecipientId(8)
        }
    ));
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    h.mock.verify();
}

#[tokio::test]
async fn issue_reports_missing_order() {
    let h = harness();
    h.mock
        .expect_find_orders_by_ids(vec![OrderId(1), OrderId(2)])
        .return_ok(vec![stored(1, 7, start() + Duration::days(1))]);

    let err = h
        .service
        .issue_order_client(&[OrderId(1), OrderId(2)])
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::OrderNotFound(OrderId(2))));
    assert!(h.cache.get(OrderId(1)).is_some(), "fetched orders are cached");
    h.mock.verify();
}

#[tokio::test]
async fn issue_rejects_empty_batch() {
    let h = harness();
    let err = h.service.issue_order_client(&[]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    h.mock.verify();
}

#[tokio::test]
async fn issue_rejects_already_issued_and_overdue_orders() {
    let h = harness();
    h.cache.set(OrderId(1), issued(1, 7, start() - Duration::hours(1)));
    h.cache.set(OrderId(2), stored(2, 7, start() - Duration::hours(1)));

    let err = h.service.issue_order_client(&[OrderId(1)]).await.unwrap_err();
    assert!(matches!(err, OrderError::AlreadyIssued(OrderId(1))));

    let err = h.service.issue_order_client(&[OrderId(2)]).await.unwrap_err();
    assert!(matches!(err, OrderError::StoragePeriodOver(OrderId(2))));
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    h.mock.verify();
}

// =============================================================================
// accept_return_client
// =============================================================================

fn return_request(id: i64, recipient: i64) -> ReturnRequest {
    ReturnRequest {
        order_id: OrderId(id),
        recipient_id: RecipientId(recipient),
    }
}

#[tokio::test]
async fn return_within_47_hours_is_accepted() {
    let h = harness();
    h.cache.set(OrderId(5), issued(5, 7, start()));
    h.clock.advance(Duration::hours(47));
    h.mock.expect_update_order(OrderId(5)).return_ok(());

    let order = h.service.accept_return_client(return_request(5, 7)).await.unwrap();

    assert!(order.issued_at.is_none());
    assert_eq!(order.returned_at, Some(start() + Duration::hours(47)));
    assert_eq!(h.cache.get(OrderId(5)), Some(order));
    h.mock.verify();
}

#[tokio::test]
async fn return_after_49_hours_is_refused() {
    let h = harness();
    h.cache.set(OrderId(5), issued(5, 7, start()));
    h.clock.advance(Duration::hours(49));

    let err = h.service.accept_return_client(return_request(5, 7)).await.unwrap_err();

    assert!(matches!(err, OrderError::NotIssuedOrExpired(OrderId(5))));
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    h.mock.verify();
}

#[tokio::test]
async fn return_of_never_issued_order_is_refused() {
    let h = harness();
    h.cache.set(OrderId(5), stored(5, 7, start() + Duration::days(1)));

    let err = h.service.accept_return_client(return_request(5, 7)).await.unwrap_err();
    assert!(matches!(err, OrderError::NotIssuedOrExpired(OrderId(5))));
    h.mock.verify();
}

#[tokio::test]
async fn return_by_another_client_is_not_found() {
    let h = harness();
    h.mock
        .expect_find_order_by_id(OrderId(5))
        .return_ok(issued(5, 7, start()));

    let err = h.service.accept_return_client(return_request(5, 8)).await.unwrap_err();

    assert!(matches!(err, OrderError::RecipientNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(h.cache.get(OrderId(5)).is_some(), "read-through still backfills");
    h.mock.verify();
}

// =============================================================================
// listings and cleanup
// =============================================================================

#[tokio::test]
async fn list_orders_collapses_empty_results_to_not_found() {
    let h = harness();
    h.mock
        .expect_find_orders_by_recipient_id(RecipientId(7))
        .return_ok(Vec::new());
    h.mock
        .expect_find_orders_by_recipient_id(RecipientId(7))
        .return_ok(vec![issued(1, 7, start())]);

    for _ in 0..2 {
        let err = h.service.list_orders(RecipientId(7), Some(10)).await.unwrap_err();
        assert!(matches!(err, OrderError::NoOrdersForRecipient(RecipientId(7))));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
    h.mock.verify();
}

#[tokio::test]
async fn list_orders_sorts_filters_and_limits() {
    let h = harness();
    h.mock
        .expect_find_orders_by_recipient_id(RecipientId(7))
        .return_ok(vec![
            stored(1, 7, start() + Duration::days(1)),
            stored(2, 7, start() + Duration::days(3)),
            issued(3, 7, start()),
            stored(4, 7, start() + Duration::days(2)),
        ]);
    h.mock
        .expect_find_orders_by_recipient_id(RecipientId(7))
        .return_ok(vec![stored(1, 7, start()), stored(2, 7, start())]);

    let limited = h.service.list_orders(RecipientId(7), Some(2)).await.unwrap();
    let ids: Vec<_> = limited.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![OrderId(2), OrderId(4)]);

    let all = h.service.list_orders(RecipientId(7), None).await.unwrap();
    assert_eq!(all.len(), 2);
    h.mock.verify();
}

#[tokio::test]
async fn list_return_orders_pages_from_one() {
    let h = harness();
    h.mock.expect_find_returned_orders(10, 20).return_ok(Vec::new());

    let page = h.service.list_return_orders(3, 10).await.unwrap();
    assert!(page.is_empty());

    for (page, limit) in [(0, 10), (1, 0)] {
        let err = h.service.list_return_orders(page, limit).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    }
    h.mock.verify();
}

#[tokio::test]
async fn cleanup_invalidates_deleted_orders() {
    let h = harness();
    let mut old = stored(5, 7, start());
    old.accept_return(start() - Duration::days(3));
    h.cache.set(OrderId(5), old);
    h.cache.set(OrderId(6), stored(6, 7, start()));
    h.mock.expect_delete_returned_orders().return_ok(vec![OrderId(5)]);

    let deleted = h.service.delete_issued_orders().await.unwrap();

    assert_eq!(deleted, 1);
    assert!(h.cache.get(OrderId(5)).is_none());
    assert!(h.cache.get(OrderId(6)).is_some());
    h.mock.verify();
}
