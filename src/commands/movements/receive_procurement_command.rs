use crate::commands::Command;
use crate::{
    db::{with_transaction, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    movements::{MovementValidator, ProcurementReceipt, ProcurementRequest, StockMutator},
    services::locations::LocationDirectory,
};
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Receives purchased devices into a warehouse, registering new device rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveProcurementCommand {
    pub actor_id: i64,
    pub request: ProcurementRequest,
}

impl ReceiveProcurementCommand {
    pub fn new(actor_id: i64, request: ProcurementRequest) -> Self {
        Self { actor_id, request }
    }
}

#[async_trait]
impl Command for ReceiveProcurementCommand {
    type Result = ProcurementReceipt;

    #[instrument(
        skip(self, db_pool, event_sender),
        fields(
            actor_id = self.actor_id,
            warehouse_id = self.request.warehouse_id,
            lines = self.request.lines.len()
        )
    )]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let request = self.request.clone();
        let actor_id = self.actor_id;

        let receipt = with_transaction(db_pool.as_ref(), "receive_procurement", move |txn| {
            Box::pin(async move {
                LocationDirectory::employee(txn, actor_id).await?;
                let validated = MovementValidator::validate_procurement(txn, &request).await?;
                StockMutator::apply_procurement(txn, &validated, actor_id).await
            })
        })
        .await
        .map_err(|e| {
            counter!("asset_ledger.procurements.rejected", 1, "kind" => e.kind().as_ref().to_string());
            warn!(error = %e, "Procurement rejected");
            e
        })?;

        counter!("asset_ledger.procurements.received", 1);
        info!(
            transaction_id = receipt.record.id(),
            devices_created = receipt.created_devices.len(),
            "Procurement received"
        );

        event_sender.publish(Event::ProcurementReceived {
            transaction_id: receipt.record.id(),
            warehouse_id: self.request.warehouse_id,
            devices_created: receipt.created_devices.len(),
            units_received: receipt.record.total_quantity(),
            actor_id,
            occurred_at: Utc::now(),
        });

        Ok(receipt)
    }
}
