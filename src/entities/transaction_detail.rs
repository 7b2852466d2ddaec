use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Line item of an asset transaction. Serialized devices always carry quantity 1.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub transaction_id: i64,
    pub line_no: i32,
    pub device_id: i64,
    pub quantity: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::asset_transaction::Entity",
        from = "Column::TransactionId",
        to = "super::asset_transaction::Column::Id"
    )]
    AssetTransaction,
    #[sea_orm(
        belongs_to = "super::device::Entity",
        from = "Column::DeviceId",
        to = "super::device::Column::Id"
    )]
    Device,
}

impl Related<super::asset_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssetTransaction.def()
    }
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
