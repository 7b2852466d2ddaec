pub mod approve_transfer_command;
pub mod confirm_transfer_command;
pub mod receive_procurement_command;
pub mod record_movement_command;

pub use approve_transfer_command::ApproveTransferCommand;
pub use confirm_transfer_command::ConfirmTransferCommand;
pub use receive_procurement_command::ReceiveProcurementCommand;
pub use record_movement_command::RecordMovementCommand;
