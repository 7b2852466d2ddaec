use crate::commands::movements::{
    ApproveTransferCommand, ConfirmTransferCommand, ReceiveProcurementCommand,
    RecordMovementCommand,
};
use crate::commands::Command;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::entities::{asset_transaction, device_model, LocationRef};
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::movements::{MovementRequest, ProcurementReceipt, ProcurementRequest};
use crate::services::ledger::{
    Ledger, LedgerEntry, Page, Reconciliation, TransactionFilter, TransactionRecord,
};
use crate::services::registry::DeviceRegistry;
use crate::services::stock_pool::StockPool;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const DEFAULT_PAGE_SIZE: u64 = 20;
const DEFAULT_MAX_PAGE_SIZE: u64 = 200;

/// Entry point collaborators use to drive the movement engine.
#[derive(Clone)]
pub struct MovementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    default_page_size: u64,
    max_page_size: u64,
}

impl MovementService {
    /// Creates a new movement service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Creates the service with paging limits taken from configuration.
    pub fn from_config(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            ..Self::new(db_pool, event_sender)
        }
    }

    pub fn db(&self) -> &DbPool {
        &self.db_pool
    }

    /// Validates and applies a movement submission as one unit of work.
    #[instrument(skip(self, request), fields(transaction_type = request.transaction_type.as_str()))]
    pub async fn record_movement(
        &self,
        actor_id: i64,
        request: MovementRequest,
    ) -> Result<TransactionRecord, ServiceError> {
        RecordMovementCommand::new(actor_id, request)
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, request), fields(warehouse_id = request.warehouse_id))]
    pub async fn receive_procurement(
        &self,
        actor_id: i64,
        request: ProcurementRequest,
    ) -> Result<ProcurementReceipt, ServiceError> {
        ReceiveProcurementCommand::new(actor_id, request)
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn approve_transfer(
        &self,
        actor_id: i64,
        transaction_id: i64,
    ) -> Result<asset_transaction::Model, ServiceError> {
        ApproveTransferCommand::new(actor_id, transaction_id)
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn confirm_transfer(
        &self,
        actor_id: i64,
        transaction_id: i64,
    ) -> Result<TransactionRecord, ServiceError> {
        ConfirmTransferCommand::new(actor_id, transaction_id)
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Gets a transaction with its line items.
    #[instrument(skip(self))]
    pub async fn get_transaction(&self, id: i64) -> Result<TransactionRecord, ServiceError> {
        Ledger::get(self.db(), id).await
    }

    /// Lists transactions, newest first. `page` is 1-based; the page size
    /// falls back to the configured default and is capped at the maximum.
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
        page: u64,
        page_size: Option<u64>,
    ) -> Result<Page<asset_transaction::Model>, ServiceError> {
        let page_size = page_size
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);
        let page = Ledger::list(self.db(), &filter, page.max(1), page_size).await?;
        debug!(total = page.total, returned = page.items.len(), "Listed transactions");
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn device_history(&self, device_id: i64) -> Result<Vec<LedgerEntry>, ServiceError> {
        DeviceRegistry::get(self.db(), device_id).await?;
        Ledger::device_history(self.db(), device_id).await
    }

    /// Units of a bulk model held at a location; zero when nothing was ever
    /// stocked there.
    #[instrument(skip(self))]
    pub async fn stock_level(
        &self,
        device_type_id: i64,
        location: LocationRef,
    ) -> Result<i32, ServiceError> {
        let model = DeviceRegistry::get_model(self.db(), device_type_id).await?;
        if model.has_serial {
            return Err(ServiceError::ValidationError(format!(
                "model {} is serialized and has no stock pool",
                model.id
            )));
        }
        match DeviceRegistry::bulk_representative(self.db(), model.id).await? {
            Some(representative) => StockPool::quantity(self.db(), representative.id, location).await,
            None => Ok(0),
        }
    }

    #[instrument(skip(self))]
    pub async fn reconcile_device(&self, device_id: i64) -> Result<Reconciliation, ServiceError> {
        let device = DeviceRegistry::get(self.db(), device_id).await?;
        let report = Ledger::reconcile(self.db(), &device).await?;
        if !report.is_consistent() {
            info!(device_id, "Device disagrees with its ledger history");
        }
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn rename_model(
        &self,
        model_id: i64,
        name: &str,
        manufacturer: Option<&str>,
    ) -> Result<device_model::Model, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "model name cannot be empty".to_string(),
            ));
        }
        DeviceRegistry::rename_model(self.db(), model_id, name, manufacturer).await
    }
}
