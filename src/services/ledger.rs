use crate::entities::{
    asset_transaction, device, device_model, employee, floor, transaction_detail, warehouse,
    DeviceStatus, LocationKind, LocationRef, TransactionType, TransferStatus,
};
use crate::errors::ServiceError;
use crate::movements::rules::{placement_after, pool_effects};
use crate::services::registry::Placement;
use crate::services::stock_pool::StockPool;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::{Expr, LikeExpr, Query, SelectStatement},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Header of a ledger row about to be appended.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub transaction_type: TransactionType,
    pub source: Option<LocationRef>,
    pub destination: Option<LocationRef>,
    pub status: Option<TransferStatus>,
    pub note: Option<String>,
    pub created_by: i64,
}

/// A transaction with its line items in line order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction: asset_transaction::Model,
    pub details: Vec<transaction_detail::Model>,
}

impl TransactionRecord {
    pub fn id(&self) -> i64 {
        self.transaction.id
    }

    pub fn total_quantity(&self) -> i64 {
        self.details.iter().map(|d| i64::from(d.quantity)).sum()
    }
}

/// One line of the ledger as seen from a single device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub transaction: asset_transaction::Model,
    pub detail: transaction_detail::Model,
}

/// Filters for the transaction listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransferStatus>,
    /// Matched against the note, device serial numbers and model names.
    pub text: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn of_type(transaction_type: TransactionType) -> Self {
        Self {
            transaction_type: Some(transaction_type),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    /// 1-based.
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            (self.total + self.page_size - 1) / self.page_size
        }
    }
}

/// Pool quantity the ledger implies versus the quantity stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDiscrepancy {
    pub location: LocationRef,
    pub ledger_quantity: i64,
    pub pool_quantity: i64,
}

/// Result of replaying a device's history against its stored state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reconciliation {
    Serialized {
        device_id: i64,
        recorded_status: DeviceStatus,
        recorded_location: Option<LocationRef>,
        /// `None` when the device has no ledger history.
        derived_status: Option<DeviceStatus>,
        derived_location: Option<LocationRef>,
        last_transaction_id: Option<i64>,
        consistent: bool,
    },
    Bulk {
        device_id: i64,
        discrepancies: Vec<PoolDiscrepancy>,
    },
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        match self {
            Reconciliation::Serialized { consistent, .. } => *consistent,
            Reconciliation::Bulk { discrepancies, .. } => discrepancies.is_empty(),
        }
    }
}

/// Append-mostly log of movements plus the replay queries validations run
/// against it. Nothing here is cached; every check reads the store.
pub struct Ledger;

impl Ledger {
    pub async fn append<C: ConnectionTrait>(
        conn: &C,
        entry: NewEntry,
        lines: &[(i64, i32)],
    ) -> Result<TransactionRecord, ServiceError> {
        let transaction = asset_transaction::ActiveModel {
            transaction_type: Set(entry.transaction_type),
            source_kind: Set(entry.source.map(|l| l.kind)),
            source_id: Set(entry.source.map(|l| l.id)),
            destination_kind: Set(entry.destination.map(|l| l.kind)),
            destination_id: Set(entry.destination.map(|l| l.id)),
            status: Set(entry.status),
            note: Set(entry.note),
            created_by: Set(entry.created_by),
            approved_by: Set(None),
            approved_at: Set(None),
            confirmed_by: Set(None),
            confirmed_at: Set(None),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        let mut details = Vec::with_capacity(lines.len());
        for (line_no, (device_id, quantity)) in lines.iter().enumerate() {
            let detail = transaction_detail::ActiveModel {
                transaction_id: Set(transaction.id),
                line_no: Set(line_no as i32),
                device_id: Set(*device_id),
                quantity: Set(*quantity),
                ..Default::default()
            }
            .insert(conn)
            .await?;
            details.push(detail);
        }

        Ok(TransactionRecord {
            transaction,
            details,
        })
    }

    pub async fn find<C: ConnectionTrait>(
        conn: &C,
        id: i64,
    ) -> Result<asset_transaction::Model, ServiceError> {
        asset_transaction::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("transaction", id))
    }

    pub async fn details<C: ConnectionTrait>(
        conn: &C,
        transaction_id: i64,
    ) -> Result<Vec<transaction_detail::Model>, ServiceError> {
        Ok(transaction_detail::Entity::find()
            .filter(transaction_detail::Column::TransactionId.eq(transaction_id))
            .order_by_asc(transaction_detail::Column::LineNo)
            .all(conn)
            .await?)
    }

    pub async fn get<C: ConnectionTrait>(
        conn: &C,
        id: i64,
    ) -> Result<TransactionRecord, ServiceError> {
        let transaction = Self::find(conn, id).await?;
        let details = Self::details(conn, id).await?;
        Ok(TransactionRecord {
            transaction,
            details,
        })
    }

    /// Every ledger line touching the device, oldest first.
    pub async fn device_history<C: ConnectionTrait>(
        conn: &C,
        device_id: i64,
    ) -> Result<Vec<LedgerEntry>, ServiceError> {
        let rows = transaction_detail::Entity::find()
            .filter(transaction_detail::Column::DeviceId.eq(device_id))
            .find_also_related(asset_transaction::Entity)
            .order_by_asc(transaction_detail::Column::TransactionId)
            .order_by_asc(transaction_detail::Column::LineNo)
            .all(conn)
            .await?;

        rows.into_iter()
            .map(|(detail, transaction)| {
                let transaction = transaction.ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "transaction detail {} has no transaction",
                        detail.id
                    ))
                })?;
                Ok(LedgerEntry {
                    transaction,
                    detail,
                })
            })
            .collect()
    }

    /// The most recent ledger line touching the device.
    pub async fn last_entry<C: ConnectionTrait>(
        conn: &C,
        device_id: i64,
    ) -> Result<Option<LedgerEntry>, ServiceError> {
        let row = transaction_detail::Entity::find()
            .filter(transaction_detail::Column::DeviceId.eq(device_id))
            .find_also_related(asset_transaction::Entity)
            .order_by_desc(transaction_detail::Column::TransactionId)
            .order_by_desc(transaction_detail::Column::LineNo)
            .one(conn)
            .await?;

        Ok(row.and_then(|(detail, transaction)| {
            transaction.map(|transaction| LedgerEntry {
                transaction,
                detail,
            })
        }))
    }

    /// Units of a bulk device the user still holds according to the ledger:
    /// everything assigned to them minus everything returned from them.
    pub async fn borrowed_quantity<C: ConnectionTrait>(
        conn: &C,
        device_id: i64,
        user_id: i64,
    ) -> Result<i64, ServiceError> {
        let user = LocationRef::user(user_id);
        let history = Self::device_history(conn, device_id).await?;

        Ok(history
            .iter()
            .map(|entry| {
                let quantity = i64::from(entry.detail.quantity);
                match entry.transaction.transaction_type {
                    TransactionType::Assignment if entry.transaction.destination() == Some(user) => {
                        quantity
                    }
                    TransactionType::ReturnFromUser if entry.transaction.source() == Some(user) => {
                        -quantity
                    }
                    _ => 0,
                }
            })
            .sum())
    }

    /// Moves a transfer from `from` to `to`, stamping the actor. Only lands if
    /// the row is still in `from`.
    pub async fn transition<C: ConnectionTrait>(
        conn: &C,
        transaction: &asset_transaction::Model,
        from: TransferStatus,
        to: TransferStatus,
        actor_id: i64,
    ) -> Result<asset_transaction::Model, ServiceError> {
        let now = Utc::now();
        let mut update = asset_transaction::Entity::update_many()
            .col_expr(asset_transaction::Column::Status, Expr::value(Some(to)));

        update = match to {
            TransferStatus::Approved => update
                .col_expr(asset_transaction::Column::ApprovedBy, Expr::value(Some(actor_id)))
                .col_expr(asset_transaction::Column::ApprovedAt, Expr::value(Some(now))),
            TransferStatus::Confirmed => update
                .col_expr(asset_transaction::Column::ConfirmedBy, Expr::value(Some(actor_id)))
                .col_expr(asset_transaction::Column::ConfirmedAt, Expr::value(Some(now))),
            TransferStatus::Pending => update,
        };

        let result = update
            .filter(asset_transaction::Column::Id.eq(transaction.id))
            .filter(asset_transaction::Column::Status.eq(from))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(format!(
                "transaction {} left {} before it could move to {}",
                transaction.id,
                from.as_str(),
                to.as_str()
            )));
        }

        Self::find(conn, transaction.id).await
    }

    /// Paged listing, newest first. `page` is 1-based.
    pub async fn list<C: ConnectionTrait>(
        conn: &C,
        filter: &TransactionFilter,
        page: u64,
        page_size: u64,
    ) -> Result<Page<asset_transaction::Model>, ServiceError> {
        if let (Some(from), Some(to)) = (filter.created_from, filter.created_to) {
            if from > to {
                return Err(ServiceError::InvalidDateRange(format!(
                    "from {} is after to {}",
                    from, to
                )));
            }
        }
        if page == 0 || page_size == 0 {
            return Err(ServiceError::ValidationError(
                "page and page size start at 1".to_string(),
            ));
        }

        let mut query = asset_transaction::Entity::find();
        if let Some(transaction_type) = filter.transaction_type {
            query = query.filter(asset_transaction::Column::TransactionType.eq(transaction_type));
        }
        if let Some(status) = filter.status {
            query = query.filter(asset_transaction::Column::Status.eq(status));
        }
        if let Some(from) = filter.created_from {
            query = query.filter(asset_transaction::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.created_to {
            query = query.filter(asset_transaction::Column::CreatedAt.lte(to));
        }
        if let Some(text) = filter.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(text_condition(text));
        }

        let paginator = query
            .order_by_desc(asset_transaction::Column::Id)
            .paginate(conn, page_size);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(Page {
            items,
            total,
            page,
            page_size,
        })
    }

    /// Replays the device's ledger history and compares the result with what
    /// is stored: the location pointer for serialized devices, the pools for
    /// bulk devices. Read-only.
    pub async fn reconcile<C: ConnectionTrait>(
        conn: &C,
        device: &device::Model,
    ) -> Result<Reconciliation, ServiceError> {
        let history = Self::device_history(conn, device.id).await?;

        if device.is_serialized() {
            let recorded = Placement::of(device);
            let derived = history.last().map(|entry| {
                placement_after(
                    entry.transaction.transaction_type,
                    entry.transaction.status,
                    entry.transaction.destination(),
                )
            });
            let consistent = match derived {
                Some(derived) => derived == recorded && device.is_consistent(),
                None => device.is_consistent(),
            };

            return Ok(Reconciliation::Serialized {
                device_id: device.id,
                recorded_status: recorded.status,
                recorded_location: recorded.location,
                derived_status: derived.map(|p| p.status),
                derived_location: derived.and_then(|p| p.location),
                last_transaction_id: history.last().map(|e| e.transaction.id),
                consistent,
            });
        }

        let mut expected: HashMap<LocationRef, i64> = HashMap::new();
        for entry in &history {
            let effects = pool_effects(
                entry.transaction.transaction_type,
                entry.transaction.status,
                entry.transaction.source(),
                entry.transaction.destination(),
                entry.detail.quantity,
            );
            for (location, delta) in effects {
                *expected.entry(location).or_insert(0) += delta;
            }
        }

        let stored: HashMap<LocationRef, i64> = StockPool::rows_for_device(conn, device.id)
            .await?
            .into_iter()
            .map(|row| (row.location(), i64::from(row.quantity)))
            .collect();

        let mut discrepancies: Vec<PoolDiscrepancy> = expected
            .iter()
            .map(|(location, ledger_quantity)| (*location, *ledger_quantity))
            .chain(
                stored
                    .keys()
                    .filter(|location| !expected.contains_key(*location))
                    .map(|location| (*location, 0)),
            )
            .filter_map(|(location, ledger_quantity)| {
                let pool_quantity = stored.get(&location).copied().unwrap_or(0);
                (pool_quantity != ledger_quantity).then_some(PoolDiscrepancy {
                    location,
                    ledger_quantity,
                    pool_quantity,
                })
            })
            .collect();
        discrepancies.sort_by_key(|d| (d.location.kind.as_str(), d.location.id));

        Ok(Reconciliation::Bulk {
            device_id: device.id,
            discrepancies,
        })
    }
}

/// Escapes `LIKE` wildcards so the text matches literally, then wraps it
/// for a substring match.
fn contains_pattern(text: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    LikeExpr::new(escaped).escape('\\')
}

/// Ids of warehouses, floors or employees whose name contains the text.
fn named_locations(kind: LocationKind, text: &str) -> SelectStatement {
    match kind {
        LocationKind::Warehouse => Query::select()
            .column(warehouse::Column::Id)
            .from(warehouse::Entity)
            .and_where(Expr::col(warehouse::Column::Name).like(contains_pattern(text)))
            .to_owned(),
        LocationKind::Floor => Query::select()
            .column(floor::Column::Id)
            .from(floor::Entity)
            .and_where(Expr::col(floor::Column::Name).like(contains_pattern(text)))
            .to_owned(),
        LocationKind::User => Query::select()
            .column(employee::Column::Id)
            .from(employee::Entity)
            .and_where(Expr::col(employee::Column::Name).like(contains_pattern(text)))
            .to_owned(),
    }
}

/// Note contains the text, an endpoint's warehouse, floor or employee name
/// contains it, or any line cites a device whose serial number or model name
/// contains it.
fn text_condition(text: &str) -> Condition {
    let matching_lines = Query::select()
        .column((
            transaction_detail::Entity,
            transaction_detail::Column::TransactionId,
        ))
        .from(transaction_detail::Entity)
        .inner_join(
            device::Entity,
            Expr::col((device::Entity, device::Column::Id)).equals((
                transaction_detail::Entity,
                transaction_detail::Column::DeviceId,
            )),
        )
        .inner_join(
            device_model::Entity,
            Expr::col((device_model::Entity, device_model::Column::Id))
                .equals((device::Entity, device::Column::ModelId)),
        )
        .cond_where(
            Condition::any()
                .add(Expr::col((device::Entity, device::Column::SerialNumber)).like(contains_pattern(text)))
                .add(Expr::col((device_model::Entity, device_model::Column::Name)).like(contains_pattern(text))),
        )
        .to_owned();

    let mut condition = Condition::any()
        .add(asset_transaction::Column::Note.like(contains_pattern(text)))
        .add(asset_transaction::Column::Id.in_subquery(matching_lines));

    for kind in [LocationKind::Warehouse, LocationKind::Floor, LocationKind::User] {
        condition = condition
            .add(
                Condition::all()
                    .add(asset_transaction::Column::SourceKind.eq(kind))
                    .add(asset_transaction::Column::SourceId.in_subquery(named_locations(kind, text))),
            )
            .add(
                Condition::all()
                    .add(asset_transaction::Column::DestinationKind.eq(kind))
                    .add(asset_transaction::Column::DestinationId.in_subquery(named_locations(kind, text))),
            );
    }
    condition
}
