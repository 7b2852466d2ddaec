use super::location::{LocationKind, LocationRef};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a device.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum DeviceStatus {
    #[sea_orm(string_value = "IN_STOCK")]
    InStock,
    #[sea_orm(string_value = "IN_FLOOR")]
    InFloor,
    #[sea_orm(string_value = "ASSIGNED")]
    Assigned,
    #[sea_orm(string_value = "ON_THE_MOVE")]
    OnTheMove,
    #[sea_orm(string_value = "REPAIR")]
    Repair,
    #[sea_orm(string_value = "DISPOSED")]
    Disposed,
    #[sea_orm(string_value = "E_WASTE")]
    EWaste,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::InStock => "IN_STOCK",
            DeviceStatus::InFloor => "IN_FLOOR",
            DeviceStatus::Assigned => "ASSIGNED",
            DeviceStatus::OnTheMove => "ON_THE_MOVE",
            DeviceStatus::Repair => "REPAIR",
            DeviceStatus::Disposed => "DISPOSED",
            DeviceStatus::EWaste => "E_WASTE",
        }
    }

    /// The location pointer a serialized device in this status must carry.
    pub fn placement_kind(&self) -> Option<LocationKind> {
        match self {
            DeviceStatus::InStock | DeviceStatus::Repair => Some(LocationKind::Warehouse),
            DeviceStatus::InFloor => Some(LocationKind::Floor),
            DeviceStatus::Assigned => Some(LocationKind::User),
            DeviceStatus::OnTheMove | DeviceStatus::Disposed | DeviceStatus::EWaste => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub model_id: i64,
    #[sea_orm(unique)]
    pub serial_number: Option<String>,
    pub status: DeviceStatus,
    pub warehouse_id: Option<i64>,
    pub floor_id: Option<i64>,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_serialized(&self) -> bool {
        self.serial_number.is_some()
    }

    /// Human readable handle used in error messages.
    pub fn label(&self) -> String {
        match &self.serial_number {
            Some(serial) => serial.clone(),
            None => format!("model {} (device {})", self.model_id, self.id),
        }
    }

    pub fn pointer_count(&self) -> usize {
        [self.warehouse_id, self.floor_id, self.user_id]
            .iter()
            .filter(|p| p.is_some())
            .count()
    }

    /// Current location pointer, if exactly one is set.
    pub fn location(&self) -> Option<LocationRef> {
        match (self.warehouse_id, self.floor_id, self.user_id) {
            (Some(id), None, None) => Some(LocationRef::warehouse(id)),
            (None, Some(id), None) => Some(LocationRef::floor(id)),
            (None, None, Some(id)) => Some(LocationRef::user(id)),
            _ => None,
        }
    }

    /// Status and pointer agree and at most one pointer is set.
    pub fn is_consistent(&self) -> bool {
        if self.pointer_count() > 1 {
            return false;
        }
        if !self.is_serialized() {
            return self.pointer_count() == 0;
        }
        self.status.placement_kind() == self.location().map(|l| l.kind)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device_model::Entity",
        from = "Column::ModelId",
        to = "super::device_model::Column::Id"
    )]
    DeviceModel,
    #[sea_orm(has_many = "super::transaction_detail::Entity")]
    TransactionDetails,
}

impl Related<super::device_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceModel.def()
    }
}

impl Related<super::transaction_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(serial: Option<&str>, status: DeviceStatus) -> Model {
        Model {
            id: 1,
            model_id: 7,
            serial_number: serial.map(str::to_string),
            status,
            warehouse_id: None,
            floor_id: None,
            user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn serialized_device_in_stock_needs_warehouse_pointer() {
        let mut d = device(Some("SN-1"), DeviceStatus::InStock);
        assert!(!d.is_consistent());

        d.warehouse_id = Some(3);
        assert!(d.is_consistent());
        assert_eq!(d.location(), Some(LocationRef::warehouse(3)));

        d.floor_id = Some(4);
        assert!(!d.is_consistent());
        assert_eq!(d.location(), None);
    }

    #[test]
    fn in_transit_device_has_no_pointer() {
        let d = device(Some("SN-2"), DeviceStatus::OnTheMove);
        assert!(d.is_consistent());
    }

    #[test]
    fn bulk_representative_never_carries_pointer() {
        let mut d = device(None, DeviceStatus::InStock);
        assert!(d.is_consistent());
        d.user_id = Some(1);
        assert!(!d.is_consistent());
    }
}
