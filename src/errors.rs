use sea_orm::error::DbErr;
use std::fmt;

/// Field-less classification of [`ServiceError`], for callers that branch on
/// the failure kind rather than render the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Database,
    NotFound,
    DuplicateTarget,
    InvalidDeviceState,
    InsufficientStock,
    LocationMissing,
    ReturnExceedsBorrowed,
    InvalidDateRange,
    InvalidTransfer,
    TransactionTypeInvalid,
    TransactionStatusInvalid,
    Validation,
    ConcurrentModification,
    Internal,
}

/// A failure tied to one line item of a submission.
#[derive(Debug)]
pub struct LineFailure {
    /// 0-based position of the line item in the submission.
    pub line: usize,
    pub error: ServiceError,
}

impl LineFailure {
    pub fn new(line: usize, error: ServiceError) -> Self {
        Self { line, error }
    }
}

impl fmt::Display for LineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line + 1, self.error)
    }
}

fn describe_failures(failures: &[LineFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate target in submission: {0}")]
    DuplicateTarget(String),

    #[error("Invalid device state: {0}")]
    InvalidDeviceState(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("No stock pool at source: {0}")]
    LocationMissing(String),

    #[error("Return exceeds borrowed quantity: {0}")]
    ReturnExceedsBorrowed(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("Transaction {0} is not a site transfer")]
    TransactionTypeInvalid(i64),

    #[error("Transaction {id} is {actual}, expected {expected}")]
    TransactionStatusInvalid {
        id: i64,
        expected: &'static str,
        actual: String,
    },

    #[error("Submission rejected: {}", describe_failures(.0))]
    Rejected(Vec<LineFailure>),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    pub fn not_found(entity: &str, key: impl fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {}", entity, key))
    }

    /// Kind of this error. For a rejected submission this is the kind of the
    /// first failing line.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DatabaseError(_) => ErrorKind::Database,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DuplicateTarget(_) => ErrorKind::DuplicateTarget,
            Self::InvalidDeviceState(_) => ErrorKind::InvalidDeviceState,
            Self::InsufficientStock(_) => ErrorKind::InsufficientStock,
            Self::LocationMissing(_) => ErrorKind::LocationMissing,
            Self::ReturnExceedsBorrowed(_) => ErrorKind::ReturnExceedsBorrowed,
            Self::InvalidDateRange(_) => ErrorKind::InvalidDateRange,
            Self::InvalidTransfer(_) => ErrorKind::InvalidTransfer,
            Self::TransactionTypeInvalid(_) => ErrorKind::TransactionTypeInvalid,
            Self::TransactionStatusInvalid { .. } => ErrorKind::TransactionStatusInvalid,
            Self::Rejected(failures) => failures
                .first()
                .map(|f| f.error.kind())
                .unwrap_or(ErrorKind::Validation),
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::ConcurrentModification(_) => ErrorKind::ConcurrentModification,
            Self::InternalError(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Every kind carried by this error, one per failing line for rejections.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self {
            Self::Rejected(failures) => failures.iter().map(|f| f.error.kind()).collect(),
            other => vec![other.kind()],
        }
    }

    /// Line failures of a rejected submission; empty for any other error.
    pub fn line_failures(&self) -> &[LineFailure] {
        match self {
            Self::Rejected(failures) => failures,
            _ => &[],
        }
    }

    /// True for failures caused by the submission itself rather than the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Database | ErrorKind::Internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_submission_reports_first_kind_and_all_kinds() {
        let err = ServiceError::Rejected(vec![
            LineFailure::new(0, ServiceError::NotFound("device SN-1".into())),
            LineFailure::new(2, ServiceError::InsufficientStock("pool".into())),
        ]);

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.kinds(),
            vec![ErrorKind::NotFound, ErrorKind::InsufficientStock]
        );
        assert_eq!(err.line_failures().len(), 2);
    }

    #[test]
    fn rejected_message_names_every_line() {
        let err = ServiceError::Rejected(vec![
            LineFailure::new(0, ServiceError::DuplicateTarget("serial SN-9".into())),
            LineFailure::new(1, ServiceError::NotFound("device SN-3".into())),
        ]);

        let message = err.to_string();
        assert!(message.contains("line 1: Duplicate target in submission: serial SN-9"));
        assert!(message.contains("line 2: Not found: device SN-3"));
    }

    #[test]
    fn status_error_names_transaction() {
        let err = ServiceError::TransactionStatusInvalid {
            id: 42,
            expected: "APPROVED",
            actual: "CONFIRMED".into(),
        };
        assert_eq!(err.to_string(), "Transaction 42 is CONFIRMED, expected APPROVED");
        assert_eq!(err.kind(), ErrorKind::TransactionStatusInvalid);
    }

    #[test]
    fn store_failures_are_not_client_errors() {
        assert!(!ServiceError::db_error("connection reset").is_client_error());
        assert!(ServiceError::InvalidTransfer("same floor".into()).is_client_error());
    }

    #[test]
    fn error_kind_renders_snake_case() {
        assert_eq!(ErrorKind::ReturnExceedsBorrowed.to_string(), "return_exceeds_borrowed");
        assert_eq!(ErrorKind::DuplicateTarget.as_ref(), "duplicate_target");
    }
}
