use crate::commands::Command;
use crate::{
    db::{with_transaction, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    movements::{MovementRequest, MovementValidator, StockMutator},
    services::{ledger::TransactionRecord, locations::LocationDirectory},
};
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Records one movement (assignment, transfer, repair, return, disposal...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMovementCommand {
    pub actor_id: i64,
    pub request: MovementRequest,
}

impl RecordMovementCommand {
    pub fn new(actor_id: i64, request: MovementRequest) -> Self {
        Self { actor_id, request }
    }
}

#[async_trait]
impl Command for RecordMovementCommand {
    type Result = TransactionRecord;

    #[instrument(
        skip(self, db_pool, event_sender),
        fields(
            actor_id = self.actor_id,
            transaction_type = self.request.transaction_type.as_str(),
            lines = self.request.lines.len()
        )
    )]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let type_name = self.request.transaction_type.as_str();
        let request = self.request.clone();
        let actor_id = self.actor_id;

        let result = with_transaction(db_pool.as_ref(), "record_movement", move |txn| {
            Box::pin(async move {
                LocationDirectory::employee(txn, actor_id).await?;
                let validated = MovementValidator::validate(txn, &request).await?;
                StockMutator::apply(txn, &validated, actor_id).await
            })
        })
        .await;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                counter!("asset_ledger.movements.rejected", 1, "type" => type_name, "kind" => e.kind().as_ref().to_string());
                warn!(error = %e, "Movement rejected");
                return Err(e);
            }
        };

        counter!("asset_ledger.movements.recorded", 1, "type" => type_name);
        info!(
            transaction_id = record.id(),
            status = record.transaction.status.map(|s| s.as_str()),
            "Movement recorded"
        );

        event_sender.publish(Event::MovementRecorded {
            transaction_id: record.id(),
            transaction_type: record.transaction.transaction_type,
            source: record.transaction.source(),
            destination: record.transaction.destination(),
            line_count: record.details.len(),
            actor_id,
            occurred_at: Utc::now(),
        });

        Ok(record)
    }
}
