//! Asset ledger library
//!
//! Tracks physical devices across warehouses, repair depots, office floors
//! and employees. Every movement is validated against a per-type rule table,
//! applied to device state and stock pools, and appended to an immutable
//! transaction ledger in one unit of work.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod movements;
pub mod services;

pub use config::AppConfig;
pub use errors::{ErrorKind, LineFailure, ServiceError};
pub use events::{Event, EventSender};
pub use movements::{LineItemRequest, MovementRequest, ProcurementLineRequest, ProcurementRequest};
pub use services::MovementService;
