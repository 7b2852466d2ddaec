use crate::entities::{employee, floor, site, warehouse, LocationKind, LocationRef};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};

/// A location reference resolved to its row.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedLocation {
    Warehouse(warehouse::Model),
    Floor(floor::Model),
    User(employee::Model),
}

impl ResolvedLocation {
    pub fn reference(&self) -> LocationRef {
        match self {
            ResolvedLocation::Warehouse(w) => LocationRef::warehouse(w.id),
            ResolvedLocation::Floor(f) => LocationRef::floor(f.id),
            ResolvedLocation::User(u) => LocationRef::user(u.id),
        }
    }

    /// Users do not belong to a site.
    pub fn site_id(&self) -> Option<i64> {
        match self {
            ResolvedLocation::Warehouse(w) => Some(w.site_id),
            ResolvedLocation::Floor(f) => Some(f.site_id),
            ResolvedLocation::User(_) => None,
        }
    }

    pub fn is_repair_depot(&self) -> bool {
        matches!(self, ResolvedLocation::Warehouse(w) if w.is_repair_depot)
    }

    pub fn name(&self) -> &str {
        match self {
            ResolvedLocation::Warehouse(w) => &w.name,
            ResolvedLocation::Floor(f) => &f.name,
            ResolvedLocation::User(u) => &u.name,
        }
    }
}

/// Lookups over sites, warehouses, floors and employees.
///
/// The registration functions exist for seeding; the full CRUD surface for
/// this data lives with collaborators.
pub struct LocationDirectory;

impl LocationDirectory {
    pub async fn site<C: ConnectionTrait>(conn: &C, id: i64) -> Result<site::Model, ServiceError> {
        site::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("site", id))
    }

    pub async fn warehouse<C: ConnectionTrait>(
        conn: &C,
        id: i64,
    ) -> Result<warehouse::Model, ServiceError> {
        warehouse::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("warehouse", id))
    }

    pub async fn floor<C: ConnectionTrait>(conn: &C, id: i64) -> Result<floor::Model, ServiceError> {
        floor::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("floor", id))
    }

    pub async fn employee<C: ConnectionTrait>(
        conn: &C,
        id: i64,
    ) -> Result<employee::Model, ServiceError> {
        employee::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("employee", id))
    }

    pub async fn resolve<C: ConnectionTrait>(
        conn: &C,
        location: LocationRef,
    ) -> Result<ResolvedLocation, ServiceError> {
        Ok(match location.kind {
            LocationKind::Warehouse => {
                ResolvedLocation::Warehouse(Self::warehouse(conn, location.id).await?)
            }
            LocationKind::Floor => ResolvedLocation::Floor(Self::floor(conn, location.id).await?),
            LocationKind::User => ResolvedLocation::User(Self::employee(conn, location.id).await?),
        })
    }

    pub async fn create_site<C: ConnectionTrait>(
        conn: &C,
        name: &str,
    ) -> Result<site::Model, ServiceError> {
        let model = site::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(model.insert(conn).await?)
    }

    pub async fn create_warehouse<C: ConnectionTrait>(
        conn: &C,
        site_id: i64,
        name: &str,
        is_repair_depot: bool,
    ) -> Result<warehouse::Model, ServiceError> {
        Self::site(conn, site_id).await?;
        let model = warehouse::ActiveModel {
            site_id: Set(site_id),
            name: Set(name.to_string()),
            is_repair_depot: Set(is_repair_depot),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(model.insert(conn).await?)
    }

    pub async fn create_floor<C: ConnectionTrait>(
        conn: &C,
        site_id: i64,
        name: &str,
    ) -> Result<floor::Model, ServiceError> {
        Self::site(conn, site_id).await?;
        let model = floor::ActiveModel {
            site_id: Set(site_id),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(model.insert(conn).await?)
    }

    pub async fn create_employee<C: ConnectionTrait>(
        conn: &C,
        name: &str,
        email: &str,
    ) -> Result<employee::Model, ServiceError> {
        let model = employee::ActiveModel {
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(model.insert(conn).await?)
    }
}
