use crate::commands::Command;
use crate::{
    db::{with_transaction, DbPool},
    entities::{asset_transaction, TransactionType, TransferStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{ledger::Ledger, locations::LocationDirectory},
};
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Fails unless the transaction is a site transfer currently in `expected`.
pub(crate) fn require_transfer_in(
    transaction: &asset_transaction::Model,
    expected: TransferStatus,
) -> Result<(), ServiceError> {
    if transaction.transaction_type != TransactionType::TransferSite {
        return Err(ServiceError::TransactionTypeInvalid(transaction.id));
    }
    if transaction.status != Some(expected) {
        return Err(ServiceError::TransactionStatusInvalid {
            id: transaction.id,
            expected: expected.as_str(),
            actual: transaction
                .status
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|| "without status".to_string()),
        });
    }
    Ok(())
}

/// Moves a site transfer from PENDING to APPROVED. No stock changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveTransferCommand {
    pub actor_id: i64,
    pub transaction_id: i64,
}

impl ApproveTransferCommand {
    pub fn new(actor_id: i64, transaction_id: i64) -> Self {
        Self {
            actor_id,
            transaction_id,
        }
    }
}

#[async_trait]
impl Command for ApproveTransferCommand {
    type Result = asset_transaction::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(actor_id = self.actor_id, transaction_id = self.transaction_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let actor_id = self.actor_id;
        let transaction_id = self.transaction_id;

        let approved = with_transaction(db_pool.as_ref(), "approve_transfer", move |txn| {
            Box::pin(async move {
                LocationDirectory::employee(txn, actor_id).await?;
                let transaction = Ledger::find(txn, transaction_id).await?;
                require_transfer_in(&transaction, TransferStatus::Pending)?;
                Ledger::transition(
                    txn,
                    &transaction,
                    TransferStatus::Pending,
                    TransferStatus::Approved,
                    actor_id,
                )
                .await
            })
        })
        .await
        .map_err(|e| {
            counter!("asset_ledger.transfers.approval_failed", 1);
            warn!(error = %e, "Transfer approval failed");
            e
        })?;

        counter!("asset_ledger.transfers.approved", 1);
        info!("Transfer approved");

        event_sender.publish(Event::TransferApproved {
            transaction_id,
            approved_by: actor_id,
            occurred_at: Utc::now(),
        });

        Ok(approved)
    }
}
