use crate::entities::{device, device_model, DeviceStatus, LocationKind, LocationRef};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

/// Where a serialized device is and what state it is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub status: DeviceStatus,
    pub location: Option<LocationRef>,
}

impl Placement {
    pub fn new(status: DeviceStatus, location: Option<LocationRef>) -> Self {
        Self { status, location }
    }

    pub fn of(device: &device::Model) -> Self {
        Self {
            status: device.status,
            location: device.location(),
        }
    }

    fn pointer(&self, kind: LocationKind) -> Option<i64> {
        self.location.filter(|l| l.kind == kind).map(|l| l.id)
    }
}

/// Device identity, model metadata and the serialized location pointer.
pub struct DeviceRegistry;

impl DeviceRegistry {
    pub async fn find<C: ConnectionTrait>(
        conn: &C,
        id: i64,
    ) -> Result<Option<device::Model>, ServiceError> {
        Ok(device::Entity::find_by_id(id).one(conn).await?)
    }

    pub async fn get<C: ConnectionTrait>(conn: &C, id: i64) -> Result<device::Model, ServiceError> {
        Self::find(conn, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("device", id))
    }

    pub async fn find_by_serial<C: ConnectionTrait>(
        conn: &C,
        serial: &str,
    ) -> Result<Option<device::Model>, ServiceError> {
        Ok(device::Entity::find()
            .filter(device::Column::SerialNumber.eq(serial))
            .one(conn)
            .await?)
    }

    /// Devices already registered under any of the given serial numbers.
    pub async fn find_by_serials<C: ConnectionTrait>(
        conn: &C,
        serials: &[String],
    ) -> Result<Vec<device::Model>, ServiceError> {
        if serials.is_empty() {
            return Ok(Vec::new());
        }
        Ok(device::Entity::find()
            .filter(device::Column::SerialNumber.is_in(serials.iter().cloned()))
            .all(conn)
            .await?)
    }

    pub async fn find_model<C: ConnectionTrait>(
        conn: &C,
        model_id: i64,
    ) -> Result<Option<device_model::Model>, ServiceError> {
        Ok(device_model::Entity::find_by_id(model_id).one(conn).await?)
    }

    pub async fn get_model<C: ConnectionTrait>(
        conn: &C,
        model_id: i64,
    ) -> Result<device_model::Model, ServiceError> {
        Self::find_model(conn, model_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("model", model_id))
    }

    /// The device row standing in for a bulk model in pools and the ledger:
    /// the oldest serial-less device of that model.
    pub async fn bulk_representative<C: ConnectionTrait>(
        conn: &C,
        model_id: i64,
    ) -> Result<Option<device::Model>, ServiceError> {
        Ok(device::Entity::find()
            .filter(device::Column::ModelId.eq(model_id))
            .filter(device::Column::SerialNumber.is_null())
            .order_by_asc(device::Column::Id)
            .one(conn)
            .await?)
    }

    /// Returns the bulk representative, creating it on first receipt.
    pub async fn ensure_bulk_representative<C: ConnectionTrait>(
        conn: &C,
        model: &device_model::Model,
    ) -> Result<(device::Model, bool), ServiceError> {
        if let Some(existing) = Self::bulk_representative(conn, model.id).await? {
            return Ok((existing, false));
        }

        let now = Utc::now();
        let created = device::ActiveModel {
            model_id: Set(model.id),
            serial_number: Set(None),
            status: Set(DeviceStatus::InStock),
            warehouse_id: Set(None),
            floor_id: Set(None),
            user_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        debug!(model_id = model.id, device_id = created.id, "Created bulk representative");
        Ok((created, true))
    }

    pub async fn register_serialized<C: ConnectionTrait>(
        conn: &C,
        model_id: i64,
        serial: &str,
        placement: Placement,
    ) -> Result<device::Model, ServiceError> {
        let now = Utc::now();
        let created = device::ActiveModel {
            model_id: Set(model_id),
            serial_number: Set(Some(serial.to_string())),
            status: Set(placement.status),
            warehouse_id: Set(placement.pointer(LocationKind::Warehouse)),
            floor_id: Set(placement.pointer(LocationKind::Floor)),
            user_id: Set(placement.pointer(LocationKind::User)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        Ok(created)
    }

    /// Moves a serialized device. The write only lands if the row still holds
    /// the status it was read with; otherwise another submission got there first.
    pub async fn place<C: ConnectionTrait>(
        conn: &C,
        device: &device::Model,
        placement: Placement,
    ) -> Result<device::Model, ServiceError> {
        if !device.is_serialized() {
            return Err(ServiceError::InternalError(format!(
                "bulk device {} has no location pointer",
                device.id
            )));
        }

        let now = Utc::now();
        let result = device::Entity::update_many()
            .col_expr(device::Column::Status, Expr::value(placement.status))
            .col_expr(
                device::Column::WarehouseId,
                Expr::value(placement.pointer(LocationKind::Warehouse)),
            )
            .col_expr(
                device::Column::FloorId,
                Expr::value(placement.pointer(LocationKind::Floor)),
            )
            .col_expr(
                device::Column::UserId,
                Expr::value(placement.pointer(LocationKind::User)),
            )
            .col_expr(device::Column::UpdatedAt, Expr::value(now))
            .filter(device::Column::Id.eq(device.id))
            .filter(device::Column::Status.eq(device.status))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(format!(
                "device {} changed since it was validated",
                device.label()
            )));
        }

        Ok(device::Model {
            status: placement.status,
            warehouse_id: placement.pointer(LocationKind::Warehouse),
            floor_id: placement.pointer(LocationKind::Floor),
            user_id: placement.pointer(LocationKind::User),
            updated_at: now,
            ..device.clone()
        })
    }

    pub async fn create_model<C: ConnectionTrait>(
        conn: &C,
        name: &str,
        manufacturer: Option<&str>,
        has_serial: bool,
    ) -> Result<device_model::Model, ServiceError> {
        let now = Utc::now();
        let model = device_model::ActiveModel {
            name: Set(name.to_string()),
            manufacturer: Set(manufacturer.map(str::to_string)),
            has_serial: Set(has_serial),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(model.insert(conn).await?)
    }

    /// Corrects a model's name and manufacturer. The serial flag never changes.
    pub async fn rename_model<C: ConnectionTrait>(
        conn: &C,
        model_id: i64,
        name: &str,
        manufacturer: Option<&str>,
    ) -> Result<device_model::Model, ServiceError> {
        let existing = Self::get_model(conn, model_id).await?;
        let mut active: device_model::ActiveModel = existing.into();
        active.name = Set(name.to_string());
        active.manufacturer = Set(manufacturer.map(str::to_string));
        active.updated_at = Set(Utc::now());
        Ok(active.update(conn).await?)
    }
}
