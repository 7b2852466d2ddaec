use super::approve_transfer_command::require_transfer_in;
use crate::commands::Command;
use crate::{
    db::{with_transaction, DbPool},
    entities::TransferStatus,
    errors::ServiceError,
    events::{Event, EventSender},
    movements::StockMutator,
    services::{
        ledger::{Ledger, TransactionRecord},
        locations::LocationDirectory,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Moves a site transfer from APPROVED to CONFIRMED and credits the
/// destination warehouse. Confirming twice fails instead of crediting twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmTransferCommand {
    pub actor_id: i64,
    pub transaction_id: i64,
}

impl ConfirmTransferCommand {
    pub fn new(actor_id: i64, transaction_id: i64) -> Self {
        Self {
            actor_id,
            transaction_id,
        }
    }
}

#[async_trait]
impl Command for ConfirmTransferCommand {
    type Result = TransactionRecord;

    #[instrument(skip(self, db_pool, event_sender), fields(actor_id = self.actor_id, transaction_id = self.transaction_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let actor_id = self.actor_id;
        let transaction_id = self.transaction_id;

        let record = with_transaction(db_pool.as_ref(), "confirm_transfer", move |txn| {
            Box::pin(async move {
                LocationDirectory::employee(txn, actor_id).await?;
                let transaction = Ledger::find(txn, transaction_id).await?;
                require_transfer_in(&transaction, TransferStatus::Approved)?;

                let transaction = Ledger::transition(
                    txn,
                    &transaction,
                    TransferStatus::Approved,
                    TransferStatus::Confirmed,
                    actor_id,
                )
                .await?;
                let record = TransactionRecord {
                    details: Ledger::details(txn, transaction.id).await?,
                    transaction,
                };

                StockMutator::apply_confirmation(txn, &record).await?;
                Ok::<_, ServiceError>(record)
            })
        })
        .await
        .map_err(|e| {
            counter!("asset_ledger.transfers.confirmation_failed", 1);
            warn!(error = %e, "Transfer confirmation failed");
            e
        })?;

        counter!("asset_ledger.transfers.confirmed", 1);
        info!(lines = record.details.len(), "Transfer confirmed");

        if let Some(destination) = record.transaction.destination() {
            event_sender.publish(Event::TransferConfirmed {
                transaction_id,
                destination_warehouse_id: destination.id,
                confirmed_by: actor_id,
                occurred_at: Utc::now(),
            });
        }

        Ok(record)
    }
}
