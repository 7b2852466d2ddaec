use super::location::{LocationKind, LocationRef};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Quantity of a bulk device type held at one warehouse, floor or user.
///
/// Rows are created lazily on first credit and never deleted; a zero quantity
/// is a valid state.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "location_stock_pool")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Representative device row of the bulk model.
    pub device_id: i64,
    pub location_kind: LocationKind,
    pub location_id: i64,
    pub quantity: i32,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn location(&self) -> LocationRef {
        LocationRef {
            kind: self.location_kind,
            id: self.location_id,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device::Entity",
        from = "Column::DeviceId",
        to = "super::device::Column::Id"
    )]
    Device,
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
