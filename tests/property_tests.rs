//! Property-based tests for the movement engine.
//!
//! Random sequences of movements run against a fresh ledger; whatever gets
//! accepted or rejected, stored state must keep agreeing with the ledger.

mod common;

use asset_ledger::entities::{LocationKind, LocationRef, TransactionType};
use asset_ledger::services::registry::DeviceRegistry;
use asset_ledger::LineItemRequest;
use common::TestLedger;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum BulkOp {
    Assign { user: usize, quantity: i32 },
    Return { user: usize, quantity: i32 },
    UseFloor { quantity: i32 },
    ReturnFloor { quantity: i32 },
}

fn bulk_op() -> impl Strategy<Value = BulkOp> {
    let quantity = 1i32..6;
    prop_oneof![
        (0usize..2, quantity.clone()).prop_map(|(user, quantity)| BulkOp::Assign { user, quantity }),
        (0usize..2, quantity.clone()).prop_map(|(user, quantity)| BulkOp::Return { user, quantity }),
        quantity.clone().prop_map(|quantity| BulkOp::UseFloor { quantity }),
        quantity.prop_map(|quantity| BulkOp::ReturnFloor { quantity }),
    ]
}

#[derive(Debug, Clone, Copy)]
enum DeviceOp {
    Assign(usize),
    ReturnFromUser(usize),
    UseFloor,
    ReturnFromFloor,
    Repair,
    ReturnFromRepair,
    TransferSite,
}

fn device_op() -> impl Strategy<Value = DeviceOp> {
    prop_oneof![
        (0usize..2).prop_map(DeviceOp::Assign),
        (0usize..2).prop_map(DeviceOp::ReturnFromUser),
        Just(DeviceOp::UseFloor),
        Just(DeviceOp::ReturnFromFloor),
        Just(DeviceOp::Repair),
        Just(DeviceOp::ReturnFromRepair),
        Just(DeviceOp::TransferSite),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn bulk_pools_match_a_simple_model(ops in prop::collection::vec(bulk_op(), 1..12)) {
        runtime().block_on(async {
            let ledger = TestLedger::new().await;
            let w = &ledger.world;
            let users = [w.alice, w.bob];
            ledger.receive_cables(w.main, 10).await;

            let mut main = 10;
            let mut floor = 0;
            let mut borrowed = [0, 0];

            for op in &ops {
                let (transaction_type, source, destination, quantity, allowed): (_, LocationRef, LocationRef, i32, bool) = match *op {
                    BulkOp::Assign { user, quantity } => {
                        (TransactionType::Assignment, w.main, users[user], quantity, quantity <= main)
                    }
                    BulkOp::Return { user, quantity } => {
                        (TransactionType::ReturnFromUser, users[user], w.main, quantity, quantity <= borrowed[user])
                    }
                    BulkOp::UseFloor { quantity } => {
                        (TransactionType::UseFloor, w.main, w.floor_1, quantity, quantity <= main)
                    }
                    BulkOp::ReturnFloor { quantity } => {
                        (TransactionType::ReturnFromFloor, w.floor_1, w.main, quantity, quantity <= floor)
                    }
                };

                let result = ledger
                    .record(transaction_type, Some(source), Some(destination), vec![ledger.cables(quantity)])
                    .await;
                prop_assert_eq!(result.is_ok(), allowed, "{:?} gave {:?}", op, result.err());

                if allowed {
                    match *op {
                        BulkOp::Assign { user, quantity } => {
                            main -= quantity;
                            borrowed[user] += quantity;
                        }
                        BulkOp::Return { user, quantity } => {
                            main += quantity;
                            borrowed[user] -= quantity;
                        }
                        BulkOp::UseFloor { quantity } => {
                            main -= quantity;
                            floor += quantity;
                        }
                        BulkOp::ReturnFloor { quantity } => {
                            main += quantity;
                            floor -= quantity;
                        }
                    }
                }
            }

            prop_assert_eq!(ledger.cables_at(w.main).await, main);
            prop_assert_eq!(ledger.cables_at(w.floor_1).await, floor);
            for (user, held) in users.iter().zip(borrowed) {
                prop_assert_eq!(ledger.cables_at(*user).await, held);
            }
            prop_assert_eq!(main + floor + borrowed.iter().sum::<i32>(), 10);

            let representative = DeviceRegistry::bulk_representative(ledger.db.as_ref(), w.cable.id)
                .await
                .expect("lookup")
                .expect("representative exists")
                .id;
            let report = ledger.service.reconcile_device(representative).await.expect("reconcile");
            prop_assert!(report.is_consistent(), "{:?}", report);
            Ok(())
        })?;
    }

    #[test]
    fn serialized_devices_keep_a_single_pointer(ops in prop::collection::vec(device_op(), 1..10)) {
        runtime().block_on(async {
            let ledger = TestLedger::new().await;
            let device_id = ledger.receive_serials(ledger.world.main, &["LT-PROP"]).await[0].id;
            let admin = ledger.admin();
            let w = &ledger.world;
            let users = [w.alice, w.bob];
            let line = || vec![LineItemRequest::serial("LT-PROP")];

            for op in &ops {
                let here = ledger.device("LT-PROP").await.location();
                let home = match here {
                    Some(location) if location.kind == LocationKind::Warehouse => location,
                    _ => w.main,
                };
                let away = if home == w.annex { w.main } else { w.annex };

                let outcome = match *op {
                    DeviceOp::Assign(user) => {
                        ledger.record(TransactionType::Assignment, Some(home), Some(users[user]), line()).await
                    }
                    DeviceOp::ReturnFromUser(user) => {
                        ledger.record(TransactionType::ReturnFromUser, Some(users[user]), Some(w.main), line()).await
                    }
                    DeviceOp::UseFloor => {
                        ledger.record(TransactionType::UseFloor, Some(home), Some(w.floor_1), line()).await
                    }
                    DeviceOp::ReturnFromFloor => {
                        ledger.record(TransactionType::ReturnFromFloor, Some(w.floor_1), Some(w.main), line()).await
                    }
                    DeviceOp::Repair => {
                        ledger.record(TransactionType::Repair, Some(home), Some(w.depot), line()).await
                    }
                    DeviceOp::ReturnFromRepair => {
                        ledger.record(TransactionType::ReturnFromRepair, Some(w.depot), Some(w.main), line()).await
                    }
                    DeviceOp::TransferSite => {
                        let created = ledger.record(TransactionType::TransferSite, Some(home), Some(away), line()).await;
                        match created {
                            Ok(record) => {
                                ledger.service.approve_transfer(admin, record.id()).await.expect("approve");
                                ledger.service.confirm_transfer(admin, record.id()).await
                            }
                            Err(e) => Err(e),
                        }
                    }
                };
                if let Err(e) = &outcome {
                    prop_assert!(e.is_client_error(), "{:?} failed unexpectedly: {}", op, e);
                }

                let device = ledger.device("LT-PROP").await;
                prop_assert!(device.pointer_count() <= 1);
                prop_assert!(device.is_consistent(), "{:?} left {:?}", op, device);
            }

            let report = ledger.service.reconcile_device(device_id).await.expect("reconcile");
            prop_assert!(report.is_consistent(), "{:?}", report);
            Ok(())
        })?;
    }
}
