//! Persistent schema of the asset ledger.
//!
//! Reference data (sites, warehouses, floors, employees) is read-mostly and
//! owned by collaborators; the remaining entities are mutated only by the
//! movement engine.

pub mod asset_transaction;
pub mod device;
pub mod device_model;
pub mod employee;
pub mod floor;
pub mod location;
pub mod location_stock_pool;
pub mod site;
pub mod transaction_detail;
pub mod warehouse;

pub use asset_transaction::{TransactionType, TransferStatus};
pub use device::DeviceStatus;
pub use location::{LocationKind, LocationRef};
