//! One descriptor per transaction type: which endpoints it takes, what a
//! serialized device must look like to be moved, and what the move does to
//! devices and pools.

use crate::entities::{DeviceStatus, LocationKind, LocationRef, TransactionType, TransferStatus};
use crate::services::registry::Placement;

/// What an endpoint of a movement has to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Any warehouse, depot or not.
    Warehouse,
    /// A warehouse flagged as repair depot.
    RepairDepot,
    Floor,
    User,
}

impl Role {
    pub fn kind(&self) -> LocationKind {
        match self {
            Role::Warehouse | Role::RepairDepot => LocationKind::Warehouse,
            Role::Floor => LocationKind::Floor,
            Role::User => LocationKind::User,
        }
    }
}

/// Relationship required between the sites of source and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteRule {
    Any,
    SameSite,
    DifferentSite,
    SameSiteDifferentFloor,
}

/// Precondition on a serialized device before it may move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// IN_STOCK with the warehouse pointer at the source.
    InStockAtSource,
    /// IN_FLOOR with the floor pointer at the source.
    InFloorAtSource,
    /// Last ledger entry put the device on the source floor.
    LastEntryOnSourceFloor,
    /// Status REPAIR and the last ledger entry is a REPAIR into the source depot.
    LastEntryRepairAtSource,
    /// Last ledger entry is an ASSIGNMENT to the source user.
    LastEntryAssignedToSource,
    /// Only reachable through procurement; devices do not exist yet.
    NewDevice,
}

/// Descriptor driving validation and mutation for one transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementRule {
    pub transaction_type: TransactionType,
    pub source: Option<Role>,
    pub destination: Option<Role>,
    pub site_rule: SiteRule,
    pub eligibility: Eligibility,
    /// Destination credit happens on confirmation instead of at creation.
    pub deferred_credit: bool,
}

impl MovementRule {
    pub fn for_type(transaction_type: TransactionType) -> Self {
        use Eligibility::*;
        use TransactionType as T;

        let (source, destination, site_rule, eligibility) = match transaction_type {
            T::Assignment => (
                Some(Role::Warehouse),
                Some(Role::User),
                SiteRule::Any,
                InStockAtSource,
            ),
            T::TransferSite => (
                Some(Role::Warehouse),
                Some(Role::Warehouse),
                SiteRule::DifferentSite,
                InStockAtSource,
            ),
            T::TransferFloor => (
                Some(Role::Floor),
                Some(Role::Floor),
                SiteRule::SameSiteDifferentFloor,
                InFloorAtSource,
            ),
            T::UseFloor => (
                Some(Role::Warehouse),
                Some(Role::Floor),
                SiteRule::SameSite,
                InStockAtSource,
            ),
            T::Repair => (
                Some(Role::Warehouse),
                Some(Role::RepairDepot),
                SiteRule::Any,
                InStockAtSource,
            ),
            T::ReturnFromRepair => (
                Some(Role::RepairDepot),
                Some(Role::Warehouse),
                SiteRule::Any,
                LastEntryRepairAtSource,
            ),
            T::ReturnFromUser => (
                Some(Role::User),
                Some(Role::Warehouse),
                SiteRule::Any,
                LastEntryAssignedToSource,
            ),
            T::ReturnFromFloor => (
                Some(Role::Floor),
                Some(Role::Warehouse),
                SiteRule::Any,
                LastEntryOnSourceFloor,
            ),
            T::Disposal | T::EWaste => (Some(Role::Warehouse), None, SiteRule::Any, InStockAtSource),
            T::Procurement => (None, Some(Role::Warehouse), SiteRule::Any, NewDevice),
        };

        Self {
            transaction_type,
            source,
            destination,
            site_rule,
            eligibility,
            deferred_credit: transaction_type == T::TransferSite,
        }
    }

    /// Workflow status a new ledger row of this type starts in.
    pub fn initial_status(&self) -> Option<TransferStatus> {
        if self.deferred_credit {
            Some(TransferStatus::Pending)
        } else {
            None
        }
    }

    pub fn debits_source(&self) -> bool {
        self.source.is_some()
    }

    /// Whether recording the movement credits the destination pool right away.
    pub fn credits_on_create(&self) -> bool {
        self.destination.is_some() && !self.deferred_credit
    }
}

/// Placement a serialized device ends up in once a ledger row of this type
/// and workflow status has been applied to it.
pub fn placement_after(
    transaction_type: TransactionType,
    status: Option<TransferStatus>,
    destination: Option<LocationRef>,
) -> Placement {
    use TransactionType as T;

    match transaction_type {
        T::Assignment => Placement::new(DeviceStatus::Assigned, destination),
        T::TransferSite => match status {
            Some(TransferStatus::Confirmed) => Placement::new(DeviceStatus::InStock, destination),
            _ => Placement::new(DeviceStatus::OnTheMove, None),
        },
        T::TransferFloor | T::UseFloor => Placement::new(DeviceStatus::InFloor, destination),
        T::Repair => Placement::new(DeviceStatus::Repair, destination),
        T::ReturnFromRepair | T::ReturnFromUser | T::ReturnFromFloor | T::Procurement => {
            Placement::new(DeviceStatus::InStock, destination)
        }
        T::Disposal => Placement::new(DeviceStatus::Disposed, None),
        T::EWaste => Placement::new(DeviceStatus::EWaste, None),
    }
}

/// Signed pool effects of one ledger line on a bulk device, as
/// (location, delta) pairs.
pub fn pool_effects(
    transaction_type: TransactionType,
    status: Option<TransferStatus>,
    source: Option<LocationRef>,
    destination: Option<LocationRef>,
    quantity: i32,
) -> Vec<(LocationRef, i64)> {
    let rule = MovementRule::for_type(transaction_type);
    let mut effects = Vec::with_capacity(2);

    if rule.debits_source() {
        if let Some(source) = source {
            effects.push((source, -i64::from(quantity)));
        }
    }

    let credited = rule.credits_on_create()
        || (rule.deferred_credit && status == Some(TransferStatus::Confirmed));
    if credited {
        if let Some(destination) = destination {
            effects.push((destination, i64::from(quantity)));
        }
    }

    effects
}
