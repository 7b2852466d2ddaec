use crate::entities::{device, device_model, DeviceStatus, LocationRef, TransactionType};
use crate::errors::{LineFailure, ServiceError};
use crate::movements::request::{
    normalize_serial, parse_lines, LineItem, MovementRequest, ProcurementLineRequest,
    ProcurementRequest,
};
use crate::movements::rules::{Eligibility, MovementRule, Role, SiteRule};
use crate::services::ledger::Ledger;
use crate::services::locations::{LocationDirectory, ResolvedLocation};
use crate::services::registry::DeviceRegistry;
use crate::services::stock_pool::StockPool;
use sea_orm::ConnectionTrait;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use validator::Validate;

/// A line item resolved to the device row it moves.
#[derive(Debug, Clone)]
pub struct ValidatedLine {
    pub line: usize,
    pub device: device::Model,
    pub quantity: i32,
}

/// A submission that passed every check and may be applied.
#[derive(Debug, Clone)]
pub struct ValidatedMovement {
    pub rule: MovementRule,
    pub source: Option<LocationRef>,
    pub destination: Option<LocationRef>,
    pub note: Option<String>,
    pub lines: Vec<ValidatedLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptLine {
    Serialized { serial: String },
    Bulk { quantity: i32 },
}

#[derive(Debug, Clone)]
pub struct ValidatedReceiptLine {
    pub line: usize,
    pub model: device_model::Model,
    pub item: ReceiptLine,
}

#[derive(Debug, Clone)]
pub struct ValidatedProcurement {
    pub warehouse: LocationRef,
    pub note: Option<String>,
    pub lines: Vec<ValidatedReceiptLine>,
}

fn reject_if_any(failures: Vec<LineFailure>) -> Result<(), ServiceError> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::Rejected(failures))
    }
}

/// Checks a submission against the store without writing anything.
///
/// Checks run in phases: endpoints, duplicate targets, resolution,
/// eligibility, sufficiency. Every failing line of a phase is reported
/// together and later phases do not run.
pub struct MovementValidator;

impl MovementValidator {
    pub async fn validate<C: ConnectionTrait>(
        conn: &C,
        request: &MovementRequest,
    ) -> Result<ValidatedMovement, ServiceError> {
        if request.transaction_type == TransactionType::Procurement {
            return Err(ServiceError::ValidationError(
                "procurement is recorded through a procurement receipt".to_string(),
            ));
        }
        request.validate()?;
        let items = parse_lines(&request.lines)?;

        let rule = MovementRule::for_type(request.transaction_type);
        let (source, _) = Self::check_endpoints(conn, &rule, request.source, request.destination).await?;

        Self::check_duplicates(&items)?;
        let lines = Self::resolve(conn, &items).await?;
        Self::check_eligibility(conn, &rule, source, &lines).await?;
        Self::check_sufficiency(conn, source, &lines).await?;

        debug!(
            transaction_type = rule.transaction_type.as_str(),
            lines = lines.len(),
            "Movement passed validation"
        );

        Ok(ValidatedMovement {
            rule,
            source: request.source,
            destination: request.destination,
            note: request.note.clone(),
            lines,
        })
    }

    /// Resolves both endpoints and applies the role and site rules of the type.
    async fn check_endpoints<C: ConnectionTrait>(
        conn: &C,
        rule: &MovementRule,
        source: Option<LocationRef>,
        destination: Option<LocationRef>,
    ) -> Result<(Option<LocationRef>, Option<LocationRef>), ServiceError> {
        let resolved_source = Self::resolve_endpoint(conn, rule, "source", rule.source, source).await?;
        let resolved_destination =
            Self::resolve_endpoint(conn, rule, "destination", rule.destination, destination).await?;

        if let (Some(src), Some(dst)) = (&resolved_source, &resolved_destination) {
            match rule.site_rule {
                SiteRule::Any => {}
                SiteRule::DifferentSite => {
                    if src.site_id() == dst.site_id() {
                        return Err(ServiceError::InvalidTransfer(format!(
                            "{} and {} are on the same site",
                            src.name(),
                            dst.name()
                        )));
                    }
                }
                SiteRule::SameSite => {
                    if src.site_id() != dst.site_id() {
                        return Err(ServiceError::InvalidTransfer(format!(
                            "{} and {} are on different sites",
                            src.name(),
                            dst.name()
                        )));
                    }
                }
                SiteRule::SameSiteDifferentFloor => {
                    if src.reference() == dst.reference() {
                        return Err(ServiceError::InvalidTransfer(format!(
                            "source and destination are both {}",
                            src.name()
                        )));
                    }
                    if src.site_id() != dst.site_id() {
                        return Err(ServiceError::InvalidTransfer(format!(
                            "{} and {} are on different sites",
                            src.name(),
                            dst.name()
                        )));
                    }
                }
            }
        }

        Ok((
            resolved_source.map(|l| l.reference()),
            resolved_destination.map(|l| l.reference()),
        ))
    }

    async fn resolve_endpoint<C: ConnectionTrait>(
        conn: &C,
        rule: &MovementRule,
        label: &str,
        role: Option<Role>,
        given: Option<LocationRef>,
    ) -> Result<Option<ResolvedLocation>, ServiceError> {
        let type_name = rule.transaction_type.as_str();
        match (role, given) {
            (None, None) => Ok(None),
            (None, Some(location)) => Err(ServiceError::ValidationError(format!(
                "{} takes no {}, got {}",
                type_name, label, location
            ))),
            (Some(role), None) => Err(ServiceError::ValidationError(format!(
                "{} needs a {} {}",
                type_name,
                role.kind().as_str(),
                label
            ))),
            (Some(role), Some(location)) => {
                if location.kind != role.kind() {
                    return Err(ServiceError::ValidationError(format!(
                        "{} {} must be a {}, got {}",
                        type_name,
                        label,
                        role.kind().as_str(),
                        location
                    )));
                }
                let resolved = LocationDirectory::resolve(conn, location).await?;
                if role == Role::RepairDepot && !resolved.is_repair_depot() {
                    return Err(ServiceError::InvalidTransfer(format!(
                        "{} is not a repair depot",
                        resolved.name()
                    )));
                }
                Ok(Some(resolved))
            }
        }
    }

    fn check_duplicates(items: &[LineItem]) -> Result<(), ServiceError> {
        let mut seen = HashSet::new();
        let failures: Vec<LineFailure> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| !seen.insert(item.target()))
            .map(|(index, item)| {
                LineFailure::new(index, ServiceError::DuplicateTarget(item.target().to_string()))
            })
            .collect();
        reject_if_any(failures)
    }

    async fn resolve<C: ConnectionTrait>(
        conn: &C,
        items: &[LineItem],
    ) -> Result<Vec<ValidatedLine>, ServiceError> {
        let mut lines = Vec::with_capacity(items.len());
        let mut failures = Vec::new();

        for (index, item) in items.iter().enumerate() {
            match Self::resolve_item(conn, item).await {
                Ok((device, quantity)) => lines.push(ValidatedLine {
                    line: index,
                    device,
                    quantity,
                }),
                Err(error @ (ServiceError::NotFound(_) | ServiceError::ValidationError(_))) => {
                    failures.push(LineFailure::new(index, error))
                }
                Err(other) => return Err(other),
            }
        }

        reject_if_any(failures)?;
        Ok(lines)
    }

    async fn resolve_item<C: ConnectionTrait>(
        conn: &C,
        item: &LineItem,
    ) -> Result<(device::Model, i32), ServiceError> {
        match item {
            LineItem::Serialized { serial } => {
                let device = DeviceRegistry::find_by_serial(conn, serial)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("device with serial", serial))?;
                Ok((device, 1))
            }
            LineItem::Bulk { model_id, quantity } => {
                let model = DeviceRegistry::get_model(conn, *model_id).await?;
                if model.has_serial {
                    return Err(ServiceError::ValidationError(format!(
                        "model {} is serialized; cite serial numbers",
                        model.id
                    )));
                }
                let representative = DeviceRegistry::bulk_representative(conn, model.id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("device of model", model.id))?;
                Ok((representative, *quantity))
            }
        }
    }

    async fn check_eligibility<C: ConnectionTrait>(
        conn: &C,
        rule: &MovementRule,
        source: Option<LocationRef>,
        lines: &[ValidatedLine],
    ) -> Result<(), ServiceError> {
        let mut failures = Vec::new();

        for line in lines {
            let outcome = if line.device.is_serialized() {
                Self::check_serialized(conn, rule, source, &line.device).await
            } else {
                Self::check_bulk(conn, rule, source, line).await
            };
            match outcome {
                Ok(()) => {}
                Err(error @ (ServiceError::InvalidDeviceState(_)
                | ServiceError::ReturnExceedsBorrowed(_))) => {
                    failures.push(LineFailure::new(line.line, error))
                }
                Err(other) => return Err(other),
            }
        }

        reject_if_any(failures)
    }

    async fn check_serialized<C: ConnectionTrait>(
        conn: &C,
        rule: &MovementRule,
        source: Option<LocationRef>,
        device: &device::Model,
    ) -> Result<(), ServiceError> {
        let source = source.ok_or_else(|| {
            ServiceError::InternalError(format!(
                "{} validated without a source",
                rule.transaction_type.as_str()
            ))
        })?;
        let here = device
            .location()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "no location".to_string());
        let wrong_state = |expected: String| {
            ServiceError::InvalidDeviceState(format!(
                "{} is {} at {}, expected {}",
                device.label(),
                device.status.as_str(),
                here,
                expected
            ))
        };

        match rule.eligibility {
            Eligibility::InStockAtSource => {
                if device.status != DeviceStatus::InStock || device.location() != Some(source) {
                    return Err(wrong_state(format!("IN_STOCK at {}", source)));
                }
            }
            Eligibility::InFloorAtSource => {
                if device.status != DeviceStatus::InFloor || device.location() != Some(source) {
                    return Err(wrong_state(format!("IN_FLOOR at {}", source)));
                }
            }
            Eligibility::LastEntryOnSourceFloor => {
                let last = Ledger::last_entry(conn, device.id).await?;
                let on_floor = last
                    .map(|entry| entry.transaction.destination() == Some(source))
                    .unwrap_or(false);
                if !on_floor {
                    return Err(wrong_state(format!("last moved onto {}", source)));
                }
            }
            Eligibility::LastEntryRepairAtSource => {
                let last = Ledger::last_entry(conn, device.id).await?;
                let in_repair = last
                    .map(|entry| {
                        entry.transaction.transaction_type == TransactionType::Repair
                            && entry.transaction.destination() == Some(source)
                    })
                    .unwrap_or(false);
                if device.status != DeviceStatus::Repair || !in_repair {
                    return Err(wrong_state(format!("last sent to repair at {}", source)));
                }
            }
            Eligibility::LastEntryAssignedToSource => {
                let last = Ledger::last_entry(conn, device.id).await?;
                let assigned = last
                    .map(|entry| {
                        entry.transaction.transaction_type == TransactionType::Assignment
                            && entry.transaction.destination() == Some(source)
                    })
                    .unwrap_or(false);
                if !assigned {
                    return Err(wrong_state(format!("last assigned to {}", source)));
                }
            }
            Eligibility::NewDevice => {
                return Err(ServiceError::InvalidDeviceState(format!(
                    "{} is already registered",
                    device.label()
                )));
            }
        }
        Ok(())
    }

    async fn check_bulk<C: ConnectionTrait>(
        conn: &C,
        rule: &MovementRule,
        source: Option<LocationRef>,
        line: &ValidatedLine,
    ) -> Result<(), ServiceError> {
        if rule.transaction_type != TransactionType::ReturnFromUser {
            return Ok(());
        }
        let Some(user) = source else {
            return Ok(());
        };

        let borrowed = Ledger::borrowed_quantity(conn, line.device.id, user.id).await?;
        if i64::from(line.quantity) > borrowed {
            return Err(ServiceError::ReturnExceedsBorrowed(format!(
                "model {}: returning {} but {} holds {}",
                line.device.model_id, line.quantity, user, borrowed
            )));
        }
        Ok(())
    }

    async fn check_sufficiency<C: ConnectionTrait>(
        conn: &C,
        source: Option<LocationRef>,
        lines: &[ValidatedLine],
    ) -> Result<(), ServiceError> {
        let Some(source) = source else {
            return Ok(());
        };
        let mut failures = Vec::new();

        for line in lines.iter().filter(|l| !l.device.is_serialized()) {
            let label = format!("model {}", line.device.model_id);
            match StockPool::check_available(conn, line.device.id, source, line.quantity, &label)
                .await
            {
                Ok(()) => {}
                Err(error @ (ServiceError::LocationMissing(_)
                | ServiceError::InsufficientStock(_))) => {
                    failures.push(LineFailure::new(line.line, error))
                }
                Err(other) => return Err(other),
            }
        }

        reject_if_any(failures)
    }

    /// Validates a procurement receipt: structure, duplicates within the
    /// submission, model resolution, then serials already in the registry.
    pub async fn validate_procurement<C: ConnectionTrait>(
        conn: &C,
        request: &ProcurementRequest,
    ) -> Result<ValidatedProcurement, ServiceError> {
        request.validate()?;
        if request.lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "submission has no line items".to_string(),
            ));
        }

        let warehouse = LocationDirectory::warehouse(conn, request.warehouse_id).await?;
        let warehouse = LocationRef::warehouse(warehouse.id);

        let mut failures = Vec::new();
        let mut parsed = Vec::with_capacity(request.lines.len());
        for (index, line) in request.lines.iter().enumerate() {
            match Self::parse_receipt_line(line) {
                Ok(item) => parsed.push((index, line.model_id, item)),
                Err(error) => failures.push(LineFailure::new(index, error)),
            }
        }
        reject_if_any(failures)?;

        let mut seen = HashSet::new();
        let duplicates: Vec<LineFailure> = parsed
            .iter()
            .filter_map(|(index, model_id, item)| {
                let target = match item {
                    ReceiptLine::Serialized { serial } => format!("serial {}", serial),
                    ReceiptLine::Bulk { .. } => format!("model {}", model_id),
                };
                (!seen.insert(target.clone()))
                    .then(|| LineFailure::new(*index, ServiceError::DuplicateTarget(target)))
            })
            .collect();
        reject_if_any(duplicates)?;

        let mut models: HashMap<i64, Option<device_model::Model>> = HashMap::new();
        let mut failures = Vec::new();
        let mut lines = Vec::with_capacity(parsed.len());
        for (index, model_id, item) in parsed {
            if !models.contains_key(&model_id) {
                let found = DeviceRegistry::find_model(conn, model_id).await?;
                models.insert(model_id, found);
            }
            let Some(model) = models.get(&model_id).cloned().flatten() else {
                failures.push(LineFailure::new(index, ServiceError::not_found("model", model_id)));
                continue;
            };
            let serialized = matches!(item, ReceiptLine::Serialized { .. });
            if model.has_serial != serialized {
                let expected = if model.has_serial {
                    "a serial number"
                } else {
                    "a quantity without serial number"
                };
                failures.push(LineFailure::new(
                    index,
                    ServiceError::ValidationError(format!("model {} needs {}", model.id, expected)),
                ));
                continue;
            }
            lines.push(ValidatedReceiptLine {
                line: index,
                model,
                item,
            });
        }
        reject_if_any(failures)?;

        let serials: Vec<String> = lines
            .iter()
            .filter_map(|l| match &l.item {
                ReceiptLine::Serialized { serial } => Some(serial.clone()),
                ReceiptLine::Bulk { .. } => None,
            })
            .collect();
        let registered: HashSet<String> = DeviceRegistry::find_by_serials(conn, &serials)
            .await?
            .into_iter()
            .filter_map(|d| d.serial_number)
            .collect();
        let clashes: Vec<LineFailure> = lines
            .iter()
            .filter_map(|l| match &l.item {
                ReceiptLine::Serialized { serial } if registered.contains(serial) => {
                    Some(LineFailure::new(
                        l.line,
                        ServiceError::DuplicateTarget(format!("serial {} is already registered", serial)),
                    ))
                }
                _ => None,
            })
            .collect();
        reject_if_any(clashes)?;

        Ok(ValidatedProcurement {
            warehouse,
            note: request.note.clone(),
            lines,
        })
    }

    fn parse_receipt_line(line: &ProcurementLineRequest) -> Result<ReceiptLine, ServiceError> {
        line.validate()?;
        match (&line.serial_number, line.quantity) {
            (Some(serial), None) | (Some(serial), Some(1)) => Ok(ReceiptLine::Serialized {
                serial: normalize_serial(serial)?,
            }),
            (Some(serial), Some(quantity)) => Err(ServiceError::ValidationError(format!(
                "serialized device {} cannot be received in quantity {}",
                serial, quantity
            ))),
            (None, Some(quantity)) => Ok(ReceiptLine::Bulk { quantity }),
            (None, None) => Err(ServiceError::ValidationError(format!(
                "model {} needs a serial number or a quantity",
                line.model_id
            ))),
        }
    }
}
