// Reference data
pub mod locations;

// Device and stock state
pub mod registry;
pub mod stock_pool;

// Append-only history
pub mod ledger;

// Facade over commands and queries
pub mod movements;

pub use movements::MovementService;
