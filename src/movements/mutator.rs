use crate::entities::{device, DeviceStatus, TransactionType, TransferStatus};
use crate::errors::ServiceError;
use crate::movements::rules::placement_after;
use crate::movements::validator::{ReceiptLine, ValidatedMovement, ValidatedProcurement};
use crate::services::ledger::{Ledger, NewEntry, TransactionRecord};
use crate::services::registry::DeviceRegistry;
use crate::services::stock_pool::StockPool;
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of a procurement receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcurementReceipt {
    pub record: TransactionRecord,
    /// Device rows created by the receipt, including new bulk representatives.
    pub created_devices: Vec<device::Model>,
}

/// Applies validated submissions to devices, pools and the ledger.
///
/// Must run inside the same unit of work as the validation that produced its
/// input. Pool debits are re-checked by the store at write time, so a debit
/// raced away between validation and mutation fails the whole submission.
pub struct StockMutator;

impl StockMutator {
    pub async fn apply<C: ConnectionTrait>(
        conn: &C,
        movement: &ValidatedMovement,
        actor_id: i64,
    ) -> Result<TransactionRecord, ServiceError> {
        let rule = &movement.rule;
        let lines: Vec<(i64, i32)> = movement
            .lines
            .iter()
            .map(|l| (l.device.id, l.quantity))
            .collect();

        let record = Ledger::append(
            conn,
            NewEntry {
                transaction_type: rule.transaction_type,
                source: movement.source,
                destination: movement.destination,
                status: rule.initial_status(),
                note: movement.note.clone(),
                created_by: actor_id,
            },
            &lines,
        )
        .await?;

        for line in &movement.lines {
            if line.device.is_serialized() {
                let placement = placement_after(
                    rule.transaction_type,
                    record.transaction.status,
                    movement.destination,
                );
                DeviceRegistry::place(conn, &line.device, placement).await?;
                continue;
            }

            let label = format!("model {}", line.device.model_id);
            if let (true, Some(source)) = (rule.debits_source(), movement.source) {
                StockPool::debit(conn, line.device.id, source, line.quantity, &label).await?;
            }
            if let (true, Some(destination)) = (rule.credits_on_create(), movement.destination) {
                StockPool::credit(conn, line.device.id, destination, line.quantity).await?;
            }
        }

        debug!(
            transaction_id = record.id(),
            transaction_type = rule.transaction_type.as_str(),
            "Applied movement"
        );
        Ok(record)
    }

    /// Lands a confirmed site transfer at its destination: bulk lines are
    /// credited, serialized devices leave ON_THE_MOVE for IN_STOCK.
    pub async fn apply_confirmation<C: ConnectionTrait>(
        conn: &C,
        record: &TransactionRecord,
    ) -> Result<(), ServiceError> {
        let transaction = &record.transaction;
        if transaction.transaction_type != TransactionType::TransferSite
            || transaction.status != Some(TransferStatus::Confirmed)
        {
            return Err(ServiceError::InternalError(format!(
                "transaction {} is not a confirmed site transfer",
                transaction.id
            )));
        }
        let destination = transaction.destination().ok_or_else(|| {
            ServiceError::InternalError(format!("transfer {} has no destination", transaction.id))
        })?;

        for detail in &record.details {
            let device = DeviceRegistry::get(conn, detail.device_id).await?;
            if device.is_serialized() {
                if device.status != DeviceStatus::OnTheMove {
                    return Err(ServiceError::InvalidDeviceState(format!(
                        "{} is {}, expected ON_THE_MOVE",
                        device.label(),
                        device.status.as_str()
                    )));
                }
                let placement = placement_after(
                    transaction.transaction_type,
                    transaction.status,
                    Some(destination),
                );
                DeviceRegistry::place(conn, &device, placement).await?;
            } else {
                StockPool::credit(conn, device.id, destination, detail.quantity).await?;
            }
        }

        Ok(())
    }

    /// Registers received devices, credits bulk units to the warehouse pool and
    /// records the PROCUREMENT ledger row.
    pub async fn apply_procurement<C: ConnectionTrait>(
        conn: &C,
        procurement: &ValidatedProcurement,
        actor_id: i64,
    ) -> Result<ProcurementReceipt, ServiceError> {
        let warehouse = procurement.warehouse;
        let mut created_devices = Vec::new();
        let mut lines = Vec::with_capacity(procurement.lines.len());

        for line in &procurement.lines {
            match &line.item {
                ReceiptLine::Serialized { serial } => {
                    let placement = placement_after(TransactionType::Procurement, None, Some(warehouse));
                    let device =
                        DeviceRegistry::register_serialized(conn, line.model.id, serial, placement)
                            .await?;
                    lines.push((device.id, 1));
                    created_devices.push(device);
                }
                ReceiptLine::Bulk { quantity } => {
                    let (representative, created) =
                        DeviceRegistry::ensure_bulk_representative(conn, &line.model).await?;
                    StockPool::credit(conn, representative.id, warehouse, *quantity).await?;
                    lines.push((representative.id, *quantity));
                    if created {
                        created_devices.push(representative);
                    }
                }
            }
        }

        let record = Ledger::append(
            conn,
            NewEntry {
                transaction_type: TransactionType::Procurement,
                source: None,
                destination: Some(warehouse),
                status: None,
                note: procurement.note.clone(),
                created_by: actor_id,
            },
            &lines,
        )
        .await?;

        Ok(ProcurementReceipt {
            record,
            created_devices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::LocationRef;
    use crate::services::registry::Placement;

    #[test]
    fn procurement_places_serialized_devices_in_stock() {
        let warehouse = LocationRef::warehouse(4);
        let placement = placement_after(TransactionType::Procurement, None, Some(warehouse));
        assert_eq!(
            placement,
            Placement::new(DeviceStatus::InStock, Some(warehouse))
        );
    }
}
