mod common;

use asset_ledger::entities::{
    device, location_stock_pool, DeviceStatus, LocationKind, TransactionType, TransferStatus,
};
use asset_ledger::services::ledger::{Reconciliation, TransactionFilter};
use asset_ledger::{LineItemRequest, MovementRequest, ServiceError};
use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::TestLedger;
use sea_orm::{sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

#[tokio::test]
async fn listing_is_newest_first_and_paged() {
    let ledger = TestLedger::new().await;
    let w = &ledger.world;
    ledger.receive_cables(w.main, 20).await;
    for _ in 0..6 {
        ledger
            .record(TransactionType::Assignment, Some(w.main), Some(w.alice), vec![ledger.cables(1)])
            .await
            .expect("assign");
    }

    let first = ledger
        .service
        .list_transactions(TransactionFilter::default(), 1, None)
        .await
        .expect("first page");
    assert_eq!(first.total, 7);
    assert_eq!(first.page_size, 5);
    assert_eq!(first.items.len(), 5);
    assert_eq!(first.total_pages(), 2);
    assert!(first.items.windows(2).all(|pair| pair[0].id > pair[1].id));

    let second = ledger
        .service
        .list_transactions(TransactionFilter::default(), 2, None)
        .await
        .expect("second page");
    assert_eq!(second.items.len(), 2);
    assert_eq!(
        second.items.last().map(|t| t.transaction_type),
        Some(TransactionType::Procurement)
    );

    let capped = ledger
        .service
        .list_transactions(TransactionFilter::default(), 1, Some(500))
        .await
        .expect("capped page");
    assert_eq!(capped.page_size, 10);
    assert_eq!(capped.items.len(), 7);
}

#[tokio::test]
async fn filters_by_type_status_and_date() {
    let ledger = TestLedger::new().await;
    let (main, annex, alice, admin) = (
        ledger.world.main,
        ledger.world.annex,
        ledger.world.alice,
        ledger.admin(),
    );
    ledger.receive_cables(main, 20).await;
    ledger
        .record(TransactionType::Assignment, Some(main), Some(alice), vec![ledger.cables(2)])
        .await
        .expect("assign");
    let pending = ledger
        .record(TransactionType::TransferSite, Some(main), Some(annex), vec![ledger.cables(3)])
        .await
        .expect("transfer");
    let approved = ledger
        .record(TransactionType::TransferSite, Some(main), Some(annex), vec![ledger.cables(4)])
        .await
        .expect("transfer");
    ledger
        .service
        .approve_transfer(admin, approved.id())
        .await
        .expect("approve");

    let transfers = ledger
        .service
        .list_transactions(TransactionFilter::of_type(TransactionType::TransferSite), 1, None)
        .await
        .expect("transfers");
    assert_eq!(transfers.total, 2);

    let awaiting = ledger
        .service
        .list_transactions(
            TransactionFilter {
                status: Some(TransferStatus::Pending),
                ..Default::default()
            },
            1,
            None,
        )
        .await
        .expect("pending transfers");
    assert_eq!(awaiting.items.iter().map(|t| t.id).collect::<Vec<_>>(), vec![pending.id()]);

    let now = Utc::now();
    let around_now = TransactionFilter {
        created_from: Some(now - Duration::hours(1)),
        created_to: Some(now + Duration::hours(1)),
        ..Default::default()
    };
    let all = ledger
        .service
        .list_transactions(around_now, 1, Some(10))
        .await
        .expect("around now");
    assert_eq!(all.total, 4);

    let yesterday = TransactionFilter {
        created_to: Some(now - Duration::days(1)),
        ..Default::default()
    };
    let none = ledger
        .service
        .list_transactions(yesterday, 1, None)
        .await
        .expect("yesterday");
    assert_eq!(none.total, 0);
}

#[tokio::test]
async fn reversed_date_range_is_rejected() {
    let ledger = TestLedger::new().await;
    let now = Utc::now();

    let err = ledger
        .service
        .list_transactions(
            TransactionFilter {
                created_from: Some(now),
                created_to: Some(now - Duration::minutes(5)),
                ..Default::default()
            },
            1,
            None,
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InvalidDateRange(_));
}

#[tokio::test]
async fn text_search_matches_notes_devices_and_endpoint_names() {
    let ledger = TestLedger::new().await;
    let w = &ledger.world;
    ledger.receive_serials(w.main, &["LT-777", "LT-888"]).await;
    ledger.receive_cables(w.main, 10).await;

    ledger
        .service
        .record_movement(
            ledger.admin(),
            MovementRequest::new(
                TransactionType::Assignment,
                Some(w.main),
                Some(w.alice),
                vec![LineItemRequest::serial("LT-777")],
            )
            .with_note("quarterly refresh"),
        )
        .await
        .expect("assign laptop");
    ledger
        .record(TransactionType::Assignment, Some(w.main), Some(w.bob), vec![ledger.cables(2)])
        .await
        .expect("assign cables");

    let search = |text: &str| TransactionFilter {
        text: Some(text.to_string()),
        ..Default::default()
    };

    let by_note = ledger
        .service
        .list_transactions(search("refresh"), 1, None)
        .await
        .expect("note search");
    assert_eq!(by_note.total, 1);
    assert_eq!(by_note.items[0].note.as_deref(), Some("quarterly refresh"));

    // The procurement and the assignment both cite LT-777.
    let by_serial = ledger
        .service
        .list_transactions(search("LT-777"), 1, None)
        .await
        .expect("serial search");
    assert_eq!(by_serial.total, 2);

    let by_model = ledger
        .service
        .list_transactions(search("USB-C"), 1, None)
        .await
        .expect("model search");
    assert_eq!(by_model.total, 2);

    let blank = ledger
        .service
        .list_transactions(search("   "), 1, None)
        .await
        .expect("blank search");
    assert_eq!(blank.total, 4);

    // Endpoint names: the employee on the receiving end, and the warehouse
    // that every one of these rows touches.
    let by_user = ledger
        .service
        .list_transactions(search("Alice"), 1, None)
        .await
        .expect("user search");
    assert_eq!(by_user.total, 1);
    assert_eq!(by_user.items[0].destination(), Some(w.alice));

    let by_warehouse = ledger
        .service
        .list_transactions(search("HQ store"), 1, None)
        .await
        .expect("warehouse search");
    assert_eq!(by_warehouse.total, 4);

    let elsewhere = ledger
        .service
        .list_transactions(search("Branch"), 1, None)
        .await
        .expect("unrelated warehouse search");
    assert_eq!(elsewhere.total, 0);
}

#[tokio::test]
async fn text_search_treats_wildcards_literally() {
    let ledger = TestLedger::new().await;
    let w = &ledger.world;
    ledger.receive_serials(w.main, &["SN-1"]).await;
    ledger.receive_serials(w.main, &["SN_1"]).await;
    ledger
        .record(TransactionType::UseFloor, Some(w.main), Some(w.floor_1), vec![LineItemRequest::serial("SN-1")])
        .await
        .expect("use floor");

    let search = |text: &str| TransactionFilter {
        text: Some(text.to_string()),
        ..Default::default()
    };

    let underscore = ledger
        .service
        .list_transactions(search("SN_1"), 1, None)
        .await
        .expect("underscore search");
    assert_eq!(underscore.total, 1);
    assert_eq!(underscore.items[0].transaction_type, TransactionType::Procurement);

    let percent = ledger
        .service
        .list_transactions(search("SN%"), 1, None)
        .await
        .expect("percent search");
    assert_eq!(percent.total, 0);

    let by_floor = ledger
        .service
        .list_transactions(search("1st floor"), 1, None)
        .await
        .expect("floor search");
    assert_eq!(by_floor.total, 1);
    assert_eq!(by_floor.items[0].transaction_type, TransactionType::UseFloor);
}

#[tokio::test]
async fn device_history_lists_every_line_in_order() {
    let ledger = TestLedger::new().await;
    let w = &ledger.world;
    let created = ledger.receive_serials(w.main, &["LT-001"]).await;
    let device_id = created[0].id;

    ledger
        .record(TransactionType::Assignment, Some(w.main), Some(w.alice), vec![LineItemRequest::serial("LT-001")])
        .await
        .expect("assign");
    ledger
        .record(TransactionType::ReturnFromUser, Some(w.alice), Some(w.main), vec![LineItemRequest::serial("LT-001")])
        .await
        .expect("return");

    let history = ledger.service.device_history(device_id).await.expect("history");
    let types: Vec<TransactionType> = history.iter().map(|e| e.transaction.transaction_type).collect();
    assert_eq!(
        types,
        vec![
            TransactionType::Procurement,
            TransactionType::Assignment,
            TransactionType::ReturnFromUser
        ]
    );
    assert!(history.iter().all(|e| e.detail.device_id == device_id));

    let record = ledger
        .service
        .get_transaction(history[1].transaction.id)
        .await
        .expect("get transaction");
    assert_eq!(record.details.len(), 1);

    assert_matches!(
        ledger.service.device_history(9_999).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        ledger.service.get_transaction(9_999).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn reconciliation_spots_drift_on_serialized_devices() {
    let ledger = TestLedger::new().await;
    let w = &ledger.world;
    let created = ledger.receive_serials(w.main, &["LT-001"]).await;
    ledger
        .record(TransactionType::UseFloor, Some(w.main), Some(w.floor_1), vec![LineItemRequest::serial("LT-001")])
        .await
        .expect("use floor");

    let report = ledger.service.reconcile_device(created[0].id).await.expect("reconcile");
    assert!(report.is_consistent());

    let mut drifted: device::ActiveModel = ledger.device("LT-001").await.into();
    drifted.status = Set(DeviceStatus::InStock);
    drifted.floor_id = Set(None);
    drifted.warehouse_id = Set(Some(w.annex.id));
    drifted.update(ledger.db.as_ref()).await.expect("tamper");

    let report = ledger.service.reconcile_device(created[0].id).await.expect("reconcile");
    assert_matches!(
        report,
        Reconciliation::Serialized {
            consistent: false,
            derived_status: Some(DeviceStatus::InFloor),
            ..
        }
    );
}

#[tokio::test]
async fn reconciliation_spots_drift_on_bulk_pools() {
    let ledger = TestLedger::new().await;
    let w = &ledger.world;
    ledger.receive_cables(w.main, 10).await;
    ledger
        .record(TransactionType::Assignment, Some(w.main), Some(w.alice), vec![ledger.cables(3)])
        .await
        .expect("assign");

    let representative = ledger
        .service
        .record_movement(
            ledger.admin(),
            MovementRequest::new(
                TransactionType::Assignment,
                Some(w.main),
                Some(w.bob),
                vec![ledger.cables(1)],
            ),
        )
        .await
        .expect("assign")
        .details[0]
        .device_id;

    let report = ledger.service.reconcile_device(representative).await.expect("reconcile");
    assert!(report.is_consistent());

    location_stock_pool::Entity::update_many()
        .col_expr(location_stock_pool::Column::Quantity, Expr::value(1))
        .filter(location_stock_pool::Column::DeviceId.eq(representative))
        .filter(location_stock_pool::Column::LocationKind.eq(LocationKind::Warehouse))
        .filter(location_stock_pool::Column::LocationId.eq(w.main.id))
        .exec(ledger.db.as_ref())
        .await
        .expect("tamper");

    let report = ledger.service.reconcile_device(representative).await.expect("reconcile");
    match report {
        Reconciliation::Bulk { discrepancies, .. } => {
            assert_eq!(discrepancies.len(), 1);
            assert_eq!(discrepancies[0].location, w.main);
            assert_eq!(discrepancies[0].ledger_quantity, 6);
            assert_eq!(discrepancies[0].pool_quantity, 1);
        }
        other => panic!("expected a bulk report, got {:?}", other),
    }
}

#[tokio::test]
async fn stock_level_is_zero_where_nothing_was_stocked() {
    let ledger = TestLedger::new().await;
    let w = &ledger.world;

    assert_eq!(ledger.cables_at(w.main).await, 0);
    ledger.receive_cables(w.main, 4).await;
    assert_eq!(ledger.cables_at(w.main).await, 4);
    assert_eq!(ledger.cables_at(w.annex).await, 0);

    let err = ledger
        .service
        .stock_level(w.laptop.id, w.main)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn models_can_be_renamed_but_not_blanked() {
    let ledger = TestLedger::new().await;
    let laptop = ledger.world.laptop.id;

    let renamed = ledger
        .service
        .rename_model(laptop, "  ThinkPad T14 Gen 4 ", Some("Lenovo"))
        .await
        .expect("rename");
    assert_eq!(renamed.name, "ThinkPad T14 Gen 4");
    assert!(renamed.has_serial);

    let err = ledger.service.rename_model(laptop, "   ", None).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}
