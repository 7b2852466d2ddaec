//! The movement engine: a rule table per transaction type, a validator that
//! checks submissions against the store and a mutator that applies them.

pub mod mutator;
pub mod request;
pub mod rules;
pub mod validator;

pub use mutator::{ProcurementReceipt, StockMutator};
pub use request::{
    LineItem, LineItemRequest, MovementRequest, ProcurementLineRequest, ProcurementRequest,
};
pub use rules::MovementRule;
pub use validator::{MovementValidator, ValidatedMovement, ValidatedProcurement};
