//! Checks the store repeats at write time. Each test validates a submission,
//! lets another submission change the state underneath it, then applies the
//! stale validation and expects the write to refuse.

mod common;

use asset_ledger::db::with_transaction;
use asset_ledger::entities::{DeviceStatus, TransactionType, TransferStatus};
use asset_ledger::movements::{MovementValidator, StockMutator};
use asset_ledger::services::ledger::{Ledger, TransactionRecord};
use asset_ledger::{LineItemRequest, MovementRequest, ServiceError};
use assert_matches::assert_matches;
use common::TestLedger;

#[tokio::test]
async fn debit_rechecks_stock_after_validation() {
    let ledger = TestLedger::new().await;
    let w = &ledger.world;
    ledger.receive_cables(w.main, 10).await;

    let request = MovementRequest::new(
        TransactionType::Assignment,
        Some(w.main),
        Some(w.alice),
        vec![ledger.cables(6)],
    );
    let validated = MovementValidator::validate(ledger.db.as_ref(), &request)
        .await
        .expect("enough stock when validated");

    ledger
        .record(TransactionType::Assignment, Some(w.main), Some(w.bob), vec![ledger.cables(8)])
        .await
        .expect("competing assignment");
    let before = ledger.transaction_count().await;

    let actor = ledger.admin();
    let result: Result<TransactionRecord, ServiceError> =
        with_transaction(ledger.db.as_ref(), "stale_debit", move |txn| {
            Box::pin(async move { StockMutator::apply(txn, &validated, actor).await })
        })
        .await;

    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));
    assert_eq!(ledger.transaction_count().await, before);
    assert_eq!(ledger.cables_at(w.main).await, 2);
    assert_eq!(ledger.cables_at(w.alice).await, 0);
    assert_eq!(ledger.cables_at(w.bob).await, 8);
}

#[tokio::test]
async fn device_moved_after_validation_is_not_overwritten() {
    let ledger = TestLedger::new().await;
    let w = &ledger.world;
    ledger.receive_serials(w.main, &["LT-001"]).await;

    let request = MovementRequest::new(
        TransactionType::Assignment,
        Some(w.main),
        Some(w.alice),
        vec![LineItemRequest::serial("LT-001")],
    );
    let validated = MovementValidator::validate(ledger.db.as_ref(), &request)
        .await
        .expect("device in stock when validated");

    ledger
        .record(TransactionType::UseFloor, Some(w.main), Some(w.floor_1), vec![LineItemRequest::serial("LT-001")])
        .await
        .expect("competing floor move");
    let before = ledger.transaction_count().await;

    let actor = ledger.admin();
    let result: Result<TransactionRecord, ServiceError> =
        with_transaction(ledger.db.as_ref(), "stale_placement", move |txn| {
            Box::pin(async move { StockMutator::apply(txn, &validated, actor).await })
        })
        .await;

    assert_matches!(result, Err(ServiceError::ConcurrentModification(_)));
    assert_eq!(ledger.transaction_count().await, before);
    let device = ledger.device("LT-001").await;
    assert_eq!(device.status, DeviceStatus::InFloor);
    assert_eq!(device.location(), Some(w.floor_1));
}

#[tokio::test]
async fn workflow_step_lost_to_another_approver_fails() {
    let ledger = TestLedger::new().await;
    let (main, annex, admin) = (ledger.world.main, ledger.world.annex, ledger.admin());
    ledger.receive_cables(main, 5).await;

    let created = ledger
        .record(TransactionType::TransferSite, Some(main), Some(annex), vec![ledger.cables(5)])
        .await
        .expect("create transfer");
    let pending = Ledger::find(ledger.db.as_ref(), created.id()).await.expect("load transfer");
    assert_eq!(pending.status, Some(TransferStatus::Pending));

    ledger
        .service
        .approve_transfer(admin, created.id())
        .await
        .expect("first approval");

    let err = Ledger::transition(
        ledger.db.as_ref(),
        &pending,
        TransferStatus::Pending,
        TransferStatus::Approved,
        admin,
    )
    .await
    .unwrap_err();

    assert_matches!(err, ServiceError::ConcurrentModification(_));
    let stored = Ledger::find(ledger.db.as_ref(), created.id()).await.expect("reload");
    assert_eq!(stored.status, Some(TransferStatus::Approved));
}
