use super::location::{LocationKind, LocationRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Kinds of stock-changing events recorded in the ledger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(24))")]
pub enum TransactionType {
    #[sea_orm(string_value = "ASSIGNMENT")]
    Assignment,
    #[sea_orm(string_value = "TRANSFER_SITE")]
    TransferSite,
    #[sea_orm(string_value = "TRANSFER_FLOOR")]
    TransferFloor,
    #[sea_orm(string_value = "USE_FLOOR")]
    UseFloor,
    #[sea_orm(string_value = "REPAIR")]
    Repair,
    #[sea_orm(string_value = "RETURN_FROM_REPAIR")]
    ReturnFromRepair,
    #[sea_orm(string_value = "RETURN_FROM_USER")]
    ReturnFromUser,
    #[sea_orm(string_value = "RETURN_FROM_FLOOR")]
    ReturnFromFloor,
    #[sea_orm(string_value = "DISPOSAL")]
    Disposal,
    #[sea_orm(string_value = "E_WASTE")]
    EWaste,
    #[sea_orm(string_value = "PROCUREMENT")]
    Procurement,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Assignment => "ASSIGNMENT",
            TransactionType::TransferSite => "TRANSFER_SITE",
            TransactionType::TransferFloor => "TRANSFER_FLOOR",
            TransactionType::UseFloor => "USE_FLOOR",
            TransactionType::Repair => "REPAIR",
            TransactionType::ReturnFromRepair => "RETURN_FROM_REPAIR",
            TransactionType::ReturnFromUser => "RETURN_FROM_USER",
            TransactionType::ReturnFromFloor => "RETURN_FROM_FLOOR",
            TransactionType::Disposal => "DISPOSAL",
            TransactionType::EWaste => "E_WASTE",
            TransactionType::Procurement => "PROCUREMENT",
        }
    }
}

/// Workflow state of a site-to-site transfer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum TransferStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::Approved => "APPROVED",
            TransferStatus::Confirmed => "CONFIRMED",
        }
    }
}

/// One movement event. Immutable once written, except for the workflow
/// columns of TRANSFER_SITE rows.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "asset_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub transaction_type: TransactionType,
    pub source_kind: Option<LocationKind>,
    pub source_id: Option<i64>,
    pub destination_kind: Option<LocationKind>,
    pub destination_id: Option<i64>,
    pub status: Option<TransferStatus>,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<i64>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn source(&self) -> Option<LocationRef> {
        LocationRef::from_columns(self.source_kind, self.source_id)
    }

    pub fn destination(&self) -> Option<LocationRef> {
        LocationRef::from_columns(self.destination_kind, self.destination_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_detail::Entity")]
    TransactionDetails,
}

impl Related<super::transaction_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionDetails.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
