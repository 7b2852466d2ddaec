use crate::entities::{location_stock_pool, LocationRef};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

/// Per (bulk device, location) quantity counters.
pub struct StockPool;

impl StockPool {
    pub async fn find<C: ConnectionTrait>(
        conn: &C,
        device_id: i64,
        location: LocationRef,
    ) -> Result<Option<location_stock_pool::Model>, ServiceError> {
        Ok(location_stock_pool::Entity::find()
            .filter(location_stock_pool::Column::DeviceId.eq(device_id))
            .filter(location_stock_pool::Column::LocationKind.eq(location.kind))
            .filter(location_stock_pool::Column::LocationId.eq(location.id))
            .one(conn)
            .await?)
    }

    /// Quantity on hand; a missing row reads as zero.
    pub async fn quantity<C: ConnectionTrait>(
        conn: &C,
        device_id: i64,
        location: LocationRef,
    ) -> Result<i32, ServiceError> {
        Ok(Self::find(conn, device_id, location)
            .await?
            .map(|row| row.quantity)
            .unwrap_or(0))
    }

    /// Every pool row of a bulk device, ordered by row id.
    pub async fn rows_for_device<C: ConnectionTrait>(
        conn: &C,
        device_id: i64,
    ) -> Result<Vec<location_stock_pool::Model>, ServiceError> {
        Ok(location_stock_pool::Entity::find()
            .filter(location_stock_pool::Column::DeviceId.eq(device_id))
            .order_by_asc(location_stock_pool::Column::Id)
            .all(conn)
            .await?)
    }

    /// Checks a pending debit against the current row without writing.
    pub async fn check_available<C: ConnectionTrait>(
        conn: &C,
        device_id: i64,
        location: LocationRef,
        quantity: i32,
        label: &str,
    ) -> Result<(), ServiceError> {
        let row = Self::find(conn, device_id, location)
            .await?
            .ok_or_else(|| ServiceError::LocationMissing(format!("{} at {}", label, location)))?;

        if row.quantity < quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "{} at {}: requested {}, available {}",
                label, location, quantity, row.quantity
            )));
        }
        Ok(())
    }

    /// Decrements a pool row. The new quantity is computed by the store under
    /// a `quantity >= n` guard, so a concurrent debit that got there first
    /// makes this one fail instead of driving the row negative.
    pub async fn debit<C: ConnectionTrait>(
        conn: &C,
        device_id: i64,
        location: LocationRef,
        quantity: i32,
        label: &str,
    ) -> Result<(), ServiceError> {
        let row = Self::find(conn, device_id, location)
            .await?
            .ok_or_else(|| ServiceError::LocationMissing(format!("{} at {}", label, location)))?;

        let result = location_stock_pool::Entity::update_many()
            .col_expr(
                location_stock_pool::Column::Quantity,
                Expr::col(location_stock_pool::Column::Quantity).sub(quantity),
            )
            .col_expr(
                location_stock_pool::Column::Version,
                Expr::col(location_stock_pool::Column::Version).add(1),
            )
            .col_expr(location_stock_pool::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(location_stock_pool::Column::Id.eq(row.id))
            .filter(location_stock_pool::Column::Quantity.gte(quantity))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            let available = Self::quantity(conn, device_id, location).await?;
            return Err(ServiceError::InsufficientStock(format!(
                "{} at {}: requested {}, available {}",
                label, location, quantity, available
            )));
        }

        debug!(device_id, %location, quantity, "Debited stock pool");
        Ok(())
    }

    /// Increments a pool row, creating it on first credit. A credit that
    /// would push the row past `i32::MAX` is refused.
    pub async fn credit<C: ConnectionTrait>(
        conn: &C,
        device_id: i64,
        location: LocationRef,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let overflow = |held: i32| {
            ServiceError::ValidationError(format!(
                "crediting {} to device {} at {} would exceed the pool limit (holds {})",
                quantity, device_id, location, held
            ))
        };

        match Self::find(conn, device_id, location).await? {
            Some(row) => {
                if row.quantity.checked_add(quantity).is_none() {
                    return Err(overflow(row.quantity));
                }

                let result = location_stock_pool::Entity::update_many()
                    .col_expr(
                        location_stock_pool::Column::Quantity,
                        Expr::col(location_stock_pool::Column::Quantity).add(quantity),
                    )
                    .col_expr(
                        location_stock_pool::Column::Version,
                        Expr::col(location_stock_pool::Column::Version).add(1),
                    )
                    .col_expr(location_stock_pool::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(location_stock_pool::Column::Id.eq(row.id))
                    .filter(location_stock_pool::Column::Quantity.lte(i32::MAX.saturating_sub(quantity)))
                    .exec(conn)
                    .await?;

                if result.rows_affected == 0 {
                    let held = Self::quantity(conn, device_id, location).await?;
                    return Err(overflow(held));
                }
            }
            None => {
                location_stock_pool::ActiveModel {
                    device_id: Set(device_id),
                    location_kind: Set(location.kind),
                    location_id: Set(location.id),
                    quantity: Set(quantity),
                    version: Set(1),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(conn)
                .await?;
            }
        }

        debug!(device_id, %location, quantity, "Credited stock pool");
        Ok(())
    }
}
